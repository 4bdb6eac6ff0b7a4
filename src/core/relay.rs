//! The relay loop
//!
//! Single sequential flow: poll the serial connection, parse each line,
//! deliver each event, and contain every failure inside the iteration that
//! produced it. Only operator cancellation (or an exhausted bounded retry
//! policy) ends the loop.

use super::connection::{ConnectError, ReadOutcome, RetryPolicy, SerialConnection};
use super::delivery::{CollectorReply, DeliveryError, EventSink, HttpCollector};
use super::event::Event;
use super::parser::{parse_line, ParseRejected};
use super::transport::{PortOpener, SerialConfig, SerialPortOpener, TransportError};
use crate::config::RelayConfig;
use crate::utils::shutdown::Shutdown;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Counters kept over the life of the relay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Successful connects
    pub connects: u64,
    /// Lines read from the device
    pub lines_read: u64,
    /// Lines that were not timing events
    pub lines_rejected: u64,
    /// Events accepted by the collector
    pub events_delivered: u64,
    /// Events dropped after a failed delivery
    pub delivery_failures: u64,
    /// Read faults that forced a reconnect
    pub transport_faults: u64,
}

/// What one iteration of the loop did
#[derive(Debug)]
pub enum StepOutcome {
    /// Nothing waiting on the link
    Idle,
    /// Line was not a timing event
    Rejected(ParseRejected),
    /// Event delivered
    Delivered(CollectorReply),
    /// Event dropped after a delivery failure
    DeliveryFailed(DeliveryError),
    /// Link failed; connection was torn down
    TransportFault(TransportError),
}

/// Drives connection, parser and delivery
pub struct RelayLoop<O: PortOpener, S: EventSink> {
    connection: SerialConnection<O>,
    sink: S,
    retry_delay: Duration,
    idle_delay: Duration,
    stats: RelayStats,
}

impl RelayLoop<SerialPortOpener, HttpCollector> {
    /// Build the production relay from static configuration
    pub fn from_config(config: &RelayConfig) -> Self {
        let serial = SerialConfig::new(&config.serial.port, config.serial.baud_rate)
            .read_timeout(config.serial.read_timeout());

        let mut retry = RetryPolicy::unlimited(config.relay.retry_delay());
        if config.relay.max_connect_attempts > 0 {
            retry = retry.max_attempts(config.relay.max_connect_attempts);
        }

        let connection = SerialConnection::new(serial, SerialPortOpener)
            .retry_policy(retry)
            .settle_delay(config.serial.settle_delay());
        let sink = HttpCollector::new(&config.collector.url, config.collector.timeout());

        Self::new(connection, sink)
            .retry_delay(config.relay.retry_delay())
            .idle_delay(config.relay.idle_delay())
    }
}

impl<O: PortOpener, S: EventSink> RelayLoop<O, S> {
    /// Create a relay over an existing connection and sink
    pub fn new(connection: SerialConnection<O>, sink: S) -> Self {
        Self {
            connection,
            sink,
            retry_delay: Duration::from_secs(5),
            idle_delay: Duration::from_millis(10),
            stats: RelayStats::default(),
        }
    }

    /// Set the pause after a transport fault
    #[must_use]
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the pause when the link is idle
    #[must_use]
    pub fn idle_delay(mut self, delay: Duration) -> Self {
        self.idle_delay = delay;
        self
    }

    /// Counters so far
    pub fn stats(&self) -> RelayStats {
        self.stats
    }

    /// The serial connection
    pub fn connection(&self) -> &SerialConnection<O> {
        &self.connection
    }

    /// The event sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Run until shutdown is requested
    ///
    /// Returns the final counters. Fails only if a bounded retry policy
    /// runs out of connect attempts.
    pub fn run(&mut self, shutdown: &Shutdown) -> Result<RelayStats, ConnectError> {
        info!("Relay started");

        let result = loop {
            if shutdown.is_requested() {
                break Ok(());
            }

            match self.step(shutdown) {
                Ok(StepOutcome::Idle) => {
                    shutdown.sleep(self.idle_delay);
                }
                Ok(StepOutcome::TransportFault(_)) => {
                    shutdown.sleep(self.retry_delay);
                }
                Ok(_) => {}
                Err(ConnectError::Cancelled) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        self.connection.close();
        let stats = self.stats;
        info!(
            connects = stats.connects,
            lines = stats.lines_read,
            rejected = stats.lines_rejected,
            delivered = stats.events_delivered,
            failed = stats.delivery_failures,
            faults = stats.transport_faults,
            "Relay stopped"
        );

        result.map(|()| stats)
    }

    /// One iteration: connect if needed, then handle at most one line
    pub fn step(&mut self, shutdown: &Shutdown) -> Result<StepOutcome, ConnectError> {
        if !self.connection.is_connected() {
            self.connection.connect(shutdown)?;
            self.stats.connects += 1;
        }

        match self.connection.read_line() {
            Ok(ReadOutcome::NoData) => Ok(StepOutcome::Idle),
            Ok(ReadOutcome::Line(line)) => {
                self.stats.lines_read += 1;
                Ok(self.handle_line(&line))
            }
            Err(e) => {
                self.stats.transport_faults += 1;
                warn!(
                    "Serial communication error: {}; reconnecting in {:?}",
                    e, self.retry_delay
                );
                Ok(StepOutcome::TransportFault(e))
            }
        }
    }

    fn handle_line(&mut self, line: &str) -> StepOutcome {
        match parse_line(line) {
            Ok(event) => {
                info!("Received {}", line.trim());
                self.deliver(&event)
            }
            Err(reason) => {
                self.stats.lines_rejected += 1;
                match reason {
                    ParseRejected::MissingPrefix => debug!("Ignoring line {:?}", line.trim()),
                    _ => warn!("Could not extract a value from {:?}: {}", line.trim(), reason),
                }
                StepOutcome::Rejected(reason)
            }
        }
    }

    fn deliver(&mut self, event: &Event) -> StepOutcome {
        info!(
            timestamp = %event.timestamp,
            elapsed_ms = event.elapsed_ms,
            "Sending event to collector"
        );

        match self.sink.deliver(event) {
            Ok(reply) => {
                self.stats.events_delivered += 1;
                match &reply {
                    CollectorReply::Success => info!("Event delivered"),
                    CollectorReply::Unexpected(value) => {
                        warn!("Collector replied without success status: {}", value);
                    }
                    CollectorReply::NotJson(text) => {
                        warn!("Collector replied with non-JSON body: {}", text);
                    }
                }
                StepOutcome::Delivered(reply)
            }
            Err(e) => {
                self.stats.delivery_failures += 1;
                error!("Delivery failed, event dropped: {}", e);
                StepOutcome::DeliveryFailed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::{LinePort, MockLinePort, MockPortOpener};
    use std::collections::VecDeque;
    use std::io;

    /// Sink that records events and replays canned results
    #[derive(Default)]
    struct RecordingSink {
        delivered: Vec<Event>,
        failures: VecDeque<DeliveryError>,
    }

    impl EventSink for RecordingSink {
        fn deliver(&mut self, event: &Event) -> Result<CollectorReply, DeliveryError> {
            self.delivered.push(event.clone());
            match self.failures.pop_front() {
                Some(e) => Err(e),
                None => Ok(CollectorReply::Success),
            }
        }
    }

    fn port_with_lines(lines: &[&'static [u8]]) -> MockLinePort {
        let mut queue: VecDeque<Vec<u8>> = lines.iter().map(|l| l.to_vec()).collect();
        let pending = queue.len();
        let mut port = MockLinePort::new();
        let mut available = pending;
        port.expect_bytes_available().returning(move || {
            let n = if available > 0 { 1 } else { 0 };
            available = available.saturating_sub(1);
            Ok(n)
        });
        port.expect_read_line()
            .times(pending)
            .returning(move || Ok(queue.pop_front().unwrap_or_default()));
        port
    }

    fn relay(
        opener: MockPortOpener,
        sink: RecordingSink,
    ) -> RelayLoop<MockPortOpener, RecordingSink> {
        let connection = SerialConnection::new(SerialConfig::new("COM9", 9600), opener)
            .retry_policy(RetryPolicy::unlimited(Duration::from_millis(1)))
            .settle_delay(Duration::ZERO);
        RelayLoop::new(connection, sink)
            .retry_delay(Duration::from_millis(1))
            .idle_delay(Duration::ZERO)
    }

    fn single_port_opener(port: MockLinePort) -> MockPortOpener {
        let mut opener = MockPortOpener::new();
        opener
            .expect_open()
            .times(1)
            .return_once(move |_| Ok(Box::new(port) as Box<dyn LinePort>));
        opener
    }

    #[test]
    fn test_time_line_is_delivered() {
        let port = port_with_lines(&[b"TIME:1532\n"]);
        let mut relay = relay(single_port_opener(port), RecordingSink::default());
        let shutdown = Shutdown::new();

        let outcome = relay.step(&shutdown).unwrap();
        assert!(matches!(outcome, StepOutcome::Delivered(CollectorReply::Success)));

        let delivered = &relay.sink().delivered;
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].elapsed_ms, 1532);
        assert_eq!(delivered[0].timestamp.len(), "YYYY-MM-DD HH:MM:SS".len());

        let stats = relay.stats();
        assert_eq!(stats.connects, 1);
        assert_eq!(stats.events_delivered, 1);
    }

    #[test]
    fn test_other_lines_are_not_delivered() {
        let port = port_with_lines(&[b"HELLO\n", b"TIME:abc\n", b"TIME:7\n"]);
        let mut relay = relay(single_port_opener(port), RecordingSink::default());
        let shutdown = Shutdown::new();

        assert!(matches!(
            relay.step(&shutdown).unwrap(),
            StepOutcome::Rejected(ParseRejected::MissingPrefix)
        ));
        assert!(matches!(
            relay.step(&shutdown).unwrap(),
            StepOutcome::Rejected(ParseRejected::NotAnInteger(_))
        ));
        assert!(relay.sink().delivered.is_empty());

        assert!(matches!(relay.step(&shutdown).unwrap(), StepOutcome::Delivered(_)));
        assert!(matches!(relay.step(&shutdown).unwrap(), StepOutcome::Idle));

        assert_eq!(relay.sink().delivered.len(), 1);
        assert_eq!(relay.stats().lines_rejected, 2);
        assert_eq!(relay.stats().lines_read, 3);
    }

    #[test]
    fn test_failed_delivery_is_dropped_and_loop_continues() {
        let port = port_with_lines(&[b"TIME:1\n", b"TIME:2\n"]);
        let sink = RecordingSink {
            failures: VecDeque::from([DeliveryError::BadStatus {
                status: 500,
                body: String::new(),
            }]),
            ..Default::default()
        };
        let mut relay = relay(single_port_opener(port), sink);
        let shutdown = Shutdown::new();

        assert!(matches!(
            relay.step(&shutdown).unwrap(),
            StepOutcome::DeliveryFailed(DeliveryError::BadStatus { status: 500, .. })
        ));
        assert!(matches!(relay.step(&shutdown).unwrap(), StepOutcome::Delivered(_)));

        // each event is attempted exactly once
        let values: Vec<i64> = relay.sink().delivered.iter().map(|e| e.elapsed_ms).collect();
        assert_eq!(values, vec![1, 2]);
        assert_eq!(relay.stats().delivery_failures, 1);
        assert_eq!(relay.stats().events_delivered, 1);
    }

    #[test]
    fn test_read_fault_triggers_reconnect() {
        let mut broken = MockLinePort::new();
        broken.expect_bytes_available().returning(|| Ok(3));
        broken.expect_read_line().times(1).returning(|| {
            Err(TransportError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "unplugged",
            )))
        });
        let healthy = port_with_lines(&[b"TIME:42\n"]);

        let mut seq = mockall::Sequence::new();
        let mut opener = MockPortOpener::new();
        opener
            .expect_open()
            .times(1)
            .in_sequence(&mut seq)
            .return_once(move |_| Ok(Box::new(broken) as Box<dyn LinePort>));
        opener
            .expect_open()
            .times(1)
            .in_sequence(&mut seq)
            .return_once(move |_| Ok(Box::new(healthy) as Box<dyn LinePort>));

        let mut relay = relay(opener, RecordingSink::default());
        let shutdown = Shutdown::new();

        assert!(matches!(
            relay.step(&shutdown).unwrap(),
            StepOutcome::TransportFault(_)
        ));
        assert!(!relay.connection().is_connected());

        assert!(matches!(relay.step(&shutdown).unwrap(), StepOutcome::Delivered(_)));
        assert_eq!(relay.stats().connects, 2);
        assert_eq!(relay.stats().transport_faults, 1);
        assert_eq!(relay.sink().delivered[0].elapsed_ms, 42);
    }

    #[test]
    fn test_run_stops_on_shutdown() {
        let shutdown = Shutdown::new();
        shutdown.request();

        let mut opener = MockPortOpener::new();
        opener.expect_open().never();
        let mut relay = relay(opener, RecordingSink::default());

        let stats = relay.run(&shutdown).unwrap();
        assert_eq!(stats, RelayStats::default());
    }

    #[test]
    fn test_run_propagates_exhausted_retries() {
        let mut opener = MockPortOpener::new();
        opener
            .expect_open()
            .times(2)
            .returning(|_| Err(TransportError::PortNotFound("COM9".into())));

        let connection = SerialConnection::new(SerialConfig::new("COM9", 9600), opener)
            .retry_policy(RetryPolicy::unlimited(Duration::from_millis(1)).max_attempts(2))
            .settle_delay(Duration::ZERO);
        let mut relay = RelayLoop::new(connection, RecordingSink::default());

        assert!(matches!(
            relay.run(&Shutdown::new()),
            Err(ConnectError::Exhausted { attempts: 2, .. })
        ));
    }
}
