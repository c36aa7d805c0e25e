//! What the session reports through the `log` facade

#[cfg(test)]
mod tests {
    use log::{Level, LevelFilter, Log, Metadata, Record};
    use parking_lot::Mutex;
    use piano_world::{RetryPolicy, Session, SessionOptions, SessionState, TcpTransport, Transport};
    use std::io::{self, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::Once;
    use std::thread::{self, ThreadId};
    use std::time::{Duration, Instant};

    struct Captured {
        level: Level,
        thread: ThreadId,
        message: String,
    }

    /// Keeps every crate record in memory.
    struct Capture {
        records: Mutex<Vec<Captured>>,
    }

    impl Log for Capture {
        fn enabled(&self, metadata: &Metadata) -> bool {
            metadata.target().starts_with("piano_world")
        }

        fn log(&self, record: &Record) {
            if self.enabled(record.metadata()) {
                self.records.lock().push(Captured {
                    level: record.level(),
                    thread: thread::current().id(),
                    message: record.args().to_string(),
                });
            }
        }

        fn flush(&self) {}
    }

    static CAPTURE: Capture = Capture {
        records: parking_lot::const_mutex(Vec::new()),
    };
    static INSTALL: Once = Once::new();

    fn install() {
        INSTALL.call_once(|| {
            log::set_logger(&CAPTURE).unwrap();
            log::set_max_level(LevelFilter::Debug);
        });
    }

    fn count(filter: impl Fn(&Captured) -> bool) -> usize {
        CAPTURE.records.lock().iter().filter(|r| filter(r)).count()
    }

    struct RefusingTransport;

    impl Transport for RefusingTransport {
        type Link = TcpStream;

        fn connect(&self) -> io::Result<TcpStream> {
            Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"))
        }

        fn describe(&self) -> String {
            "nowhere".into()
        }
    }

    #[test]
    fn each_failed_connect_is_logged() {
        install();
        let me = thread::current().id();
        let options = SessionOptions {
            retry: RetryPolicy::fixed(5, Duration::from_millis(1)),
            ..Default::default()
        };
        let mut session = Session::new(RefusingTransport, options);

        assert!(session.start().is_err());
        assert_eq!(session.state(), SessionState::Failed);

        // four retries announced, then one final failure
        assert_eq!(count(|r| r.thread == me && r.level == Level::Warn), 4);
        assert_eq!(count(|r| r.thread == me && r.level == Level::Error), 1);
        assert_eq!(
            count(|r| r.thread == me
                && r.level == Level::Error
                && r.message.contains("after 5 attempts")),
            1
        );
    }

    #[test]
    fn peer_hangup_is_logged_once() {
        install();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (mut s, _) = listener.accept().unwrap();
            s.write_all(&9u32.to_le_bytes()).unwrap();
        });

        let mut session = Session::new(TcpTransport::new("127.0.0.1", port), SessionOptions::default());
        session.start().unwrap();
        server.join().unwrap();

        let closed = |r: &Captured| {
            r.level == Level::Warn && r.message.contains("Server closed the connection")
        };
        let start = Instant::now();
        while (count(closed) == 0 || session.state() != SessionState::Closed)
            && start.elapsed() < Duration::from_secs(2)
        {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(count(closed), 1);
        assert_eq!(session.state(), SessionState::Closed);
    }
}
