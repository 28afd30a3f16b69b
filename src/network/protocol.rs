//! Wire format shared by the server and the terminal client.
//!
//! Every message is one frame: a big-endian `u16` byte length followed by
//! that many bytes of UTF-8 text.

use crate::core::{Board, PlayerId};
use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const CHAT_PREFIX: &str = "CHAT:";
pub const BOARD_HEADER: &str = "Current board:\n";

const UNDO_REQUEST: &str = "UNDO_REQUEST";
const UNDO_ACCEPTED: &str = "UNDO_ACCEPTED";
const UNDO_REJECTED: &str = "UNDO_REJECTED";
const UNDO_RESPONSE_REQUIRED: &str = "UNDO_RESPONSE_REQUIRED";
const UNDO_SUCCESSFUL: &str = "UNDO_SUCCESSFUL";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("expected \"<row>,<col>\", got {0:?}")]
    MalformedMove(String),
}

/// Peer -> Server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Move { row: isize, col: isize },
    UndoRequest,
    UndoResponse { accepted: bool },
    /// `CHAT:` を含む受信フレームそのもの
    Chat(String),
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<ClientMessage, ProtocolError> {
        if text.starts_with(CHAT_PREFIX) {
            return Ok(ClientMessage::Chat(text.to_string()));
        }
        match text.trim() {
            UNDO_REQUEST => Ok(ClientMessage::UndoRequest),
            UNDO_ACCEPTED => Ok(ClientMessage::UndoResponse { accepted: true }),
            UNDO_REJECTED => Ok(ClientMessage::UndoResponse { accepted: false }),
            coords => {
                let malformed = || ProtocolError::MalformedMove(text.to_string());
                let (row, col) = coords.split_once(',').ok_or_else(malformed)?;
                let row = row.trim().parse().map_err(|_| malformed())?;
                let col = col.trim().parse().map_err(|_| malformed())?;
                Ok(ClientMessage::Move { row, col })
            }
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            ClientMessage::Move { row, col } => format!("{},{}", row, col),
            ClientMessage::UndoRequest => UNDO_REQUEST.to_string(),
            ClientMessage::UndoResponse { accepted: true } => UNDO_ACCEPTED.to_string(),
            ClientMessage::UndoResponse { accepted: false } => UNDO_REJECTED.to_string(),
            ClientMessage::Chat(text) => text.clone(),
        }
    }
}

/// Server -> Peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Role(PlayerId),
    YourTurn,
    OpponentTurn,
    /// `Board::render` の出力
    Board(String),
    InvalidMove,
    ForbiddenMove,
    Win,
    Lose,
    Draw,
    NotYourTurn,
    UndoPending,
    NoPriorMove,
    UndoAlreadyPending,
    NoPendingUndo,
    UndoResponseRequired,
    UndoSuccessful,
    UndoRejected,
    Chat(String),
}

impl ServerMessage {
    pub fn board(board: &Board) -> Self {
        ServerMessage::Board(board.render())
    }

    pub fn to_text(&self) -> String {
        match self {
            ServerMessage::Role(player) => format!(
                "You are Player {} ({}).",
                player.number(),
                player.stone()
            ),
            ServerMessage::Board(rows) => format!("{}{}", BOARD_HEADER, rows),
            ServerMessage::Chat(text) => text.clone(),
            other => other.fixed_text().unwrap_or_default().to_string(),
        }
    }

    fn fixed_text(&self) -> Option<&'static str> {
        let text = match self {
            ServerMessage::YourTurn => "Your turn.",
            ServerMessage::OpponentTurn => "Opponent turn.",
            ServerMessage::InvalidMove => "Invalid move. Try again.",
            ServerMessage::ForbiddenMove => "Forbidden move! Try again.",
            ServerMessage::Win => "You win!",
            ServerMessage::Lose => "You lose!",
            ServerMessage::Draw => "Draw!",
            ServerMessage::NotYourTurn => "Not your turn.",
            ServerMessage::UndoPending => "Waiting for undo response.",
            ServerMessage::NoPriorMove => "No move to undo.",
            ServerMessage::UndoAlreadyPending => "Undo already requested.",
            ServerMessage::NoPendingUndo => "No undo request to answer.",
            ServerMessage::UndoResponseRequired => UNDO_RESPONSE_REQUIRED,
            ServerMessage::UndoSuccessful => UNDO_SUCCESSFUL,
            ServerMessage::UndoRejected => UNDO_REJECTED,
            ServerMessage::Role(_) | ServerMessage::Board(_) | ServerMessage::Chat(_) => {
                return None
            }
        };
        Some(text)
    }

    /// クライアント側の解釈。知らない文言は None
    pub fn parse(text: &str) -> Option<ServerMessage> {
        if let Some(rows) = text.strip_prefix(BOARD_HEADER) {
            return Some(ServerMessage::Board(rows.to_string()));
        }
        if text.starts_with(CHAT_PREFIX) {
            return Some(ServerMessage::Chat(text.to_string()));
        }
        for player in [PlayerId::Player1, PlayerId::Player2] {
            let role = ServerMessage::Role(player);
            if text == role.to_text() {
                return Some(role);
            }
        }
        const FIXED: [ServerMessage; 15] = [
            ServerMessage::YourTurn,
            ServerMessage::OpponentTurn,
            ServerMessage::InvalidMove,
            ServerMessage::ForbiddenMove,
            ServerMessage::Win,
            ServerMessage::Lose,
            ServerMessage::Draw,
            ServerMessage::NotYourTurn,
            ServerMessage::UndoPending,
            ServerMessage::NoPriorMove,
            ServerMessage::UndoAlreadyPending,
            ServerMessage::NoPendingUndo,
            ServerMessage::UndoResponseRequired,
            ServerMessage::UndoSuccessful,
            ServerMessage::UndoRejected,
        ];
        FIXED
            .into_iter()
            .find(|msg| msg.fixed_text() == Some(text))
    }
}

/// 1 フレーム読む。フレーム境界での EOF は Ok(None)
pub async fn read_frame<R>(reader: &mut R) -> io::Result<Option<String>>
where
    R: AsyncRead + Unpin,
{
    let len = match reader.read_u16().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    };
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    String::from_utf8(buf)
        .map(Some)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

pub async fn write_frame<W>(writer: &mut W, text: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let len = u16::try_from(text.len()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("frame of {} bytes exceeds u16 length prefix", text.len()),
        )
    })?;
    writer.write_u16(len).await?;
    writer.write_all(text.as_bytes()).await?;
    writer.flush().await
}
