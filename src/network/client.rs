use crate::core::PlayerId;
use crate::network::protocol::{read_frame, write_frame, ClientMessage, ServerMessage, CHAT_PREFIX};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

pub struct NetworkClient {
    stream: TcpStream,
}

/// 標準入力の 1 行をサーバーへ送る文面に変換する。空行は None
pub fn translate_input(line: &str, player: Option<PlayerId>) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let msg = match line {
        "undo" => ClientMessage::UndoRequest,
        "accept" | "y" => ClientMessage::UndoResponse { accepted: true },
        "reject" | "n" => ClientMessage::UndoResponse { accepted: false },
        _ => match line.strip_prefix("say ") {
            Some(text) => {
                let sender = player
                    .map(|p| format!("Player {}", p.number()))
                    .unwrap_or_else(|| "Player".to_string());
                ClientMessage::Chat(format!("{}{}: {}", CHAT_PREFIX, sender, text.trim()))
            }
            // 座標などはそのまま送り、サーバーに判定させる
            None => return Some(line.to_string()),
        },
    };
    Some(msg.to_text())
}

impl NetworkClient {
    pub async fn connect(addr: &str) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self { stream })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let (mut reader, mut writer) = self.stream.into_split();

        // 1. 役割の通知を待つ
        println!("Waiting for the server...");
        let Some(first) = read_frame(&mut reader).await? else {
            println!("Connection closed.");
            return Ok(());
        };
        let player = match ServerMessage::parse(&first) {
            Some(ServerMessage::Role(player)) => Some(player),
            _ => None,
        };
        crate::display::render_message(&first);

        // 2. 標準入力を中継
        let input = tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await? {
                if let Some(text) = translate_input(&line, player) {
                    debug!(%text, "sending");
                    write_frame(&mut writer, &text).await?;
                }
            }
            Ok::<(), anyhow::Error>(())
        });

        // 3. Message loop
        while let Some(text) = read_frame(&mut reader).await? {
            crate::display::render_message(&text);
        }
        input.abort();
        println!("Connection closed.");
        Ok(())
    }
}
