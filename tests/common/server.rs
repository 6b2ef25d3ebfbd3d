//! Server end of an in-memory connection.

use tokio::io::{
    AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf,
};
use tokio::time::timeout;

use super::WAIT;

/// Reads what the link writes and feeds it lines.
pub struct FakeServer {
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    writer: WriteHalf<DuplexStream>,
}

impl FakeServer {
    pub fn new(stream: DuplexStream) -> Self {
        let (read, writer) = tokio::io::split(stream);
        Self {
            lines: BufReader::new(read).lines(),
            writer,
        }
    }

    /// Next line from the link; `None` on EOF or timeout.
    pub async fn recv(&mut self) -> Option<String> {
        match timeout(WAIT, self.lines.next_line()).await {
            Ok(Ok(line)) => line,
            _ => None,
        }
    }

    /// Assert the next line is `want`.
    pub async fn expect(&mut self, want: &str) {
        assert_eq!(self.recv().await.as_deref(), Some(want));
    }

    /// Skip lines until one matches.
    pub async fn recv_until(&mut self, pred: impl Fn(&str) -> bool) -> String {
        loop {
            match self.recv().await {
                Some(line) if pred(&line) => return line,
                Some(_) => continue,
                None => panic!("connection ended before the expected line"),
            }
        }
    }

    /// Send a line (CRLF appended).
    pub async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .expect("link hung up");
    }

    /// Send raw bytes, terminator included.
    pub async fn send_bytes(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.expect("link hung up");
    }

    /// Round-trip a PING; everything sent before it has been dispatched once
    /// this returns.
    pub async fn sync(&mut self) {
        self.send("PING :sync").await;
        self.recv_until(|l| l == "PONG :sync").await;
    }

    /// Walk a default-config link through registration.
    pub async fn register(&mut self) {
        self.expect("CAP LS 302").await;
        self.expect("NICK bot").await;
        self.expect("USER bot 0 * :Bot").await;
        self.send(":srv CAP * LS :").await;
        self.expect("CAP END").await;
        self.send(":srv 001 bot :Welcome").await;
        self.send(":srv 376 bot :End of /MOTD command.").await;
        self.expect("WHOIS bot").await;
    }

    /// Assert the link closes its end.
    pub async fn assert_closed(&mut self) {
        loop {
            match timeout(WAIT, self.lines.next_line()).await {
                Ok(Ok(Some(_))) => continue,
                Ok(Ok(None)) | Ok(Err(_)) => return,
                Err(_) => panic!("link did not close the connection"),
            }
        }
    }
}
