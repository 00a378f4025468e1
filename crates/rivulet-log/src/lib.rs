use chrono::Local;
use log::{Level, Log, SetLoggerError, set_boxed_logger, set_max_level};
use std::io::{BufWriter, Write, stdout};
use std::sync::mpsc;
use std::thread;

/// Bound on queued records before `log!` callers start dropping messages.
const CHANNEL_CAPACITY: usize = 4096;

enum LogCommand {
    Record(String),
    Flush,
}

/// Buffered stdout logger behind the `log` facade.
///
/// Formatting happens on the calling thread; writing and flushing happen on a
/// dedicated writer thread so the packet path never blocks on stdout.
pub struct RivuletLogger {
    max_level: Level,
    sender: mpsc::SyncSender<LogCommand>,
}

impl RivuletLogger {
    fn new(max_level: Level) -> (Self, mpsc::Receiver<LogCommand>) {
        let (sender, receiver) = mpsc::sync_channel(CHANNEL_CAPACITY);
        (RivuletLogger { max_level, sender }, receiver)
    }

    /// Installs the logger globally and spawns the writer thread.
    pub fn init(max_level: Level) -> Result<(), SetLoggerError> {
        let (logger, receiver) = RivuletLogger::new(max_level);

        thread::Builder::new()
            .name("rivulet-log-writer".into())
            .spawn(move || {
                let mut writer = BufWriter::new(stdout());
                while let Ok(command) = receiver.recv() {
                    match command {
                        LogCommand::Record(message) => {
                            if let Err(e) = writer.write_all(message.as_bytes()) {
                                eprintln!("[RivuletLogger] failed to write record: {}", e);
                            }
                        }
                        LogCommand::Flush => {
                            if let Err(e) = writer.flush() {
                                eprintln!("[RivuletLogger] failed to flush: {}", e);
                            }
                        }
                    }
                }
                // Channel closed; make sure buffered records reach the terminal.
                let _ = writer.flush();
            })
            .expect("failed to spawn logger thread");

        set_boxed_logger(Box::new(logger))?;
        set_max_level(max_level.to_level_filter());
        Ok(())
    }
}

impl Log for RivuletLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let now = Local::now();
            let message = format!(
                "{} {} [{}] {}\n",
                now.format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            );

            // Queue full or writer gone: drop the record rather than stall.
            let _ = self.sender.try_send(LogCommand::Record(message));
        }
    }

    fn flush(&self) {
        let _ = self.sender.send(LogCommand::Flush);
    }
}
