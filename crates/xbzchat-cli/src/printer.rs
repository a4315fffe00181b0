//! Line-oriented transcript output.

use std::io::Write;

use xbzchat_client::{ChatLog, SessionHandler, describe};
use xbzchat_core::{ChatMessage, Message};

/// Prints session activity as it happens, keeping a [`ChatLog`] alongside.
pub struct Printer<W: Write + Send + 'static> {
    log: ChatLog,
    out: W,
}

impl<W: Write + Send + 'static> Printer<W> {
    pub fn new(out: W) -> Self {
        Self { log: ChatLog::new(), out }
    }

    fn line(&mut self, text: &str) {
        // stdout gone: nothing useful left to do with the line
        let _ = writeln!(self.out, "{text}");
        let _ = self.out.flush();
    }
}

impl<W: Write + Send + 'static> SessionHandler for Printer<W> {
    fn on_open(&mut self) {
        let rejoined = self.log.is_reconnecting();
        self.log.on_open();
        self.line(if rejoined { "-- reconnected --" } else { "-- connected --" });
    }

    fn on_close(&mut self) {
        self.log.on_close();
        self.line("-- disconnected --");
    }

    fn on_message(&mut self, message: Message) {
        self.line(&describe(&message));
        self.log.on_message(message);
    }

    fn on_history_item(&mut self, item: ChatMessage) {
        self.line(&describe(&Message::Chat(item.clone())));
        self.log.on_history_item(item);
    }

    fn on_online_users(&mut self, users: Vec<String>) {
        self.line(&format!("-- online: {} --", users.join(", ")));
        self.log.on_online_users(users);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(printer: &Printer<Vec<u8>>) -> String {
        String::from_utf8(printer.out.clone()).unwrap()
    }

    #[test]
    fn prints_transcript_and_tracks_log() {
        let mut printer = Printer::new(Vec::new());
        printer.on_open();
        printer.on_online_users(vec!["tom".to_string(), "x".to_string()]);
        printer.on_history_item(ChatMessage::new("x", "earlier", "t1"));
        printer.on_message(Message::Chat(ChatMessage::new("tom", "[img:42]", "t2")));
        printer.on_close();
        printer.on_open();

        assert_eq!(
            output(&printer),
            "-- connected --\n\
             -- online: tom, x --\n\
             [t1] x: earlier\n\
             [t2] tom: <image /xbzchat/v1/image/42>\n\
             -- disconnected --\n\
             -- reconnected --\n"
        );
        assert!(printer.log.entries().is_empty());
        assert_eq!(printer.log.online(), &["tom".to_string(), "x".to_string()]);
    }
}
