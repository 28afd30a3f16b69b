use crate::core::PlayerId;
use crate::game::{Match, MatchEnd, MatchError, MoveOutcome, UndoOutcome};
use crate::network::protocol::{read_frame, write_frame, ClientMessage, ServerMessage};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 各プレイヤーのタスクから対局アクターへ届くイベント
#[derive(Debug)]
enum PeerEvent {
    Frame(String),
    Closed,
    Failed(io::Error),
}

type Events = mpsc::Sender<(PlayerId, PeerEvent)>;

/// 決着後に送信キューを流し切るまで待つ上限
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

struct Peer {
    outbox: mpsc::Sender<String>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Peer {
    fn spawn<S>(player: PlayerId, stream: S, queue: usize, events: Events) -> Peer
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let (outbox, rx) = mpsc::channel(queue);
        Peer {
            outbox,
            reader: tokio::spawn(read_loop(player, read_half, events.clone())),
            writer: tokio::spawn(write_loop(player, write_half, rx, events)),
        }
    }
}

async fn read_loop<R>(player: PlayerId, mut reader: R, events: Events)
where
    R: AsyncRead + Unpin,
{
    loop {
        let event = match read_frame(&mut reader).await {
            Ok(Some(text)) => PeerEvent::Frame(text),
            Ok(None) => PeerEvent::Closed,
            Err(e) => PeerEvent::Failed(e),
        };
        let last = !matches!(event, PeerEvent::Frame(_));
        if events.send((player, event)).await.is_err() || last {
            return;
        }
    }
}

async fn write_loop<W>(player: PlayerId, mut writer: W, mut rx: mpsc::Receiver<String>, events: Events)
where
    W: AsyncWrite + Unpin,
{
    while let Some(text) = rx.recv().await {
        if let Err(e) = write_frame(&mut writer, &text).await {
            let _ = events.send((player, PeerEvent::Failed(e))).await;
            return;
        }
    }
    let _ = writer.shutdown().await;
}

async fn flush_writer(player: PlayerId, mut writer: JoinHandle<()>) {
    if tokio::time::timeout(FLUSH_TIMEOUT, &mut writer).await.is_err() {
        warn!(?player, "peer is not reading, dropping unsent frames");
        writer.abort();
    }
}

fn error_reply(err: MatchError) -> ServerMessage {
    match err {
        MatchError::NotYourTurn => ServerMessage::NotYourTurn,
        MatchError::NotInProgress | MatchError::IllegalPosition(_) => ServerMessage::InvalidMove,
        MatchError::ForbiddenMove(_) => ServerMessage::ForbiddenMove,
        MatchError::UndoPending => ServerMessage::UndoPending,
        MatchError::NoPriorMove => ServerMessage::NoPriorMove,
        MatchError::UndoAlreadyPending => ServerMessage::UndoAlreadyPending,
        MatchError::NoPendingUndo | MatchError::NotUndoResponder => ServerMessage::NoPendingUndo,
    }
}

/// 二人分の接続で 1 局を進めるアクター。対局状態はこの構造体からしか変更されない
struct Session<'a> {
    game: &'a mut Match,
    outboxes: [mpsc::Sender<String>; 2],
    /// 送信キューがあふれた、または閉じたプレイヤー
    stalled: Option<PlayerId>,
}

impl Session<'_> {
    fn send(&mut self, to: PlayerId, msg: ServerMessage) {
        let outbox = &self.outboxes[to as usize];
        if let Err(e) = outbox.try_send(msg.to_text()) {
            warn!(player = ?to, error = %e, "outbound queue unavailable");
            self.stalled.get_or_insert(to);
        }
    }

    fn broadcast(&mut self, msg: ServerMessage) {
        self.send(PlayerId::Player1, msg.clone());
        self.send(PlayerId::Player2, msg);
    }

    fn broadcast_board(&mut self) {
        let board = ServerMessage::board(self.game.board());
        self.broadcast(board);
    }

    fn announce_turn(&mut self, turn: PlayerId) {
        self.send(turn, ServerMessage::YourTurn);
        self.send(turn.opponent(), ServerMessage::OpponentTurn);
    }

    fn handle(&mut self, player: PlayerId, text: &str) -> Option<MatchEnd> {
        let msg = match ClientMessage::parse(text) {
            Ok(msg) => msg,
            Err(e) => {
                debug!(?player, error = %e, "malformed message");
                self.send(player, ServerMessage::InvalidMove);
                return None;
            }
        };

        match msg {
            ClientMessage::Chat(text) => {
                self.send(player.opponent(), ServerMessage::Chat(text));
                None
            }
            ClientMessage::Move { row, col } => self.on_move(player, row, col),
            ClientMessage::UndoRequest => {
                match self.game.request_undo(player) {
                    Ok(()) => {
                        info!(?player, "undo requested");
                        self.send(player.opponent(), ServerMessage::UndoResponseRequired);
                    }
                    Err(e) => self.send(player, error_reply(e)),
                }
                None
            }
            ClientMessage::UndoResponse { accepted } => {
                match self.game.respond_undo(player, accepted) {
                    Ok(UndoOutcome::Accepted { undone, turn }) => {
                        info!(%undone, "undo accepted");
                        self.broadcast(ServerMessage::UndoSuccessful);
                        self.broadcast_board();
                        self.announce_turn(turn);
                    }
                    Ok(UndoOutcome::Rejected { requester }) => {
                        info!(?requester, "undo rejected");
                        self.send(requester, ServerMessage::UndoRejected);
                    }
                    Err(e) => self.send(player, error_reply(e)),
                }
                None
            }
        }
    }

    fn on_move(&mut self, player: PlayerId, row: isize, col: isize) -> Option<MatchEnd> {
        match self.game.submit_move(player, row, col) {
            Ok(MoveOutcome::Continue { next }) => {
                self.broadcast_board();
                self.announce_turn(next);
                None
            }
            Ok(MoveOutcome::Won(winner)) => {
                self.broadcast_board();
                self.send(winner, ServerMessage::Win);
                self.send(winner.opponent(), ServerMessage::Lose);
                Some(MatchEnd::Won(winner))
            }
            Ok(MoveOutcome::Draw) => {
                self.broadcast_board();
                self.broadcast(ServerMessage::Draw);
                Some(MatchEnd::Draw)
            }
            Err(e) => {
                debug!(?player, row, col, error = %e, "move rejected");
                self.send(player, error_reply(e));
                None
            }
        }
    }
}

/// 1 局を最後まで進め、終了後に `game` を AwaitingPlayers に戻す。
///
/// 決着時は送信キューを流し切ってから接続を閉じる。読まない相手への残りは
/// `FLUSH_TIMEOUT` で諦める。切断や送信失敗の場合は相手に理由を伝えずに
/// 打ち切る。
pub async fn run_session<S1, S2>(game: &mut Match, first: S1, second: S2, queue: usize) -> MatchEnd
where
    S1: AsyncRead + AsyncWrite + Send + 'static,
    S2: AsyncRead + AsyncWrite + Send + 'static,
{
    let (events_tx, mut events) = mpsc::channel(queue.max(1) * 2);
    let p1 = Peer::spawn(PlayerId::Player1, first, queue.max(1), events_tx.clone());
    let p2 = Peer::spawn(PlayerId::Player2, second, queue.max(1), events_tx);

    game.start();
    info!(board_size = game.board().size(), "match started");

    let mut session = Session {
        game,
        outboxes: [p1.outbox.clone(), p2.outbox.clone()],
        stalled: None,
    };
    session.announce_turn(PlayerId::Player1);

    let end = loop {
        if let Some(player) = session.stalled {
            warn!(?player, "peer cannot keep up, abandoning match");
            break MatchEnd::Abandoned;
        }
        let Some((player, event)) = events.recv().await else {
            break MatchEnd::Abandoned;
        };
        match event {
            PeerEvent::Frame(text) => {
                if let Some(end) = session.handle(player, &text) {
                    break end;
                }
            }
            PeerEvent::Closed => {
                info!(?player, "player disconnected");
                break MatchEnd::Abandoned;
            }
            PeerEvent::Failed(e) => {
                warn!(?player, error = %e, "connection failed");
                break MatchEnd::Abandoned;
            }
        }
    };

    let Session { game, outboxes, .. } = session;
    drop(outboxes);
    drop(events);
    let [w1, w2] = [p1, p2].map(|peer| {
        peer.reader.abort();
        drop(peer.outbox);
        peer.writer
    });
    if end == MatchEnd::Abandoned {
        w1.abort();
        w2.abort();
    } else {
        tokio::join!(
            flush_writer(PlayerId::Player1, w1),
            flush_writer(PlayerId::Player2, w2)
        );
    }

    if end == MatchEnd::Abandoned {
        game.abandon();
    } else {
        game.reset();
    }
    info!(?end, "match finished");
    end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Board, Cell, Stone};
    use crate::game::MatchState;
    use crate::logic::ForbiddenPolicy;
    use tokio::io::DuplexStream;

    struct TestPeer {
        stream: DuplexStream,
    }

    impl TestPeer {
        async fn send(&mut self, text: &str) {
            write_frame(&mut self.stream, text).await.unwrap();
        }

        async fn recv(&mut self) -> String {
            read_frame(&mut self.stream)
                .await
                .unwrap()
                .expect("connection closed")
        }

        async fn expect(&mut self, msg: ServerMessage) {
            assert_eq!(self.recv().await, msg.to_text());
        }

        async fn recv_board(&mut self) -> Board {
            match ServerMessage::parse(&self.recv().await) {
                Some(ServerMessage::Board(rows)) => Board::parse(&rows).expect("board"),
                other => panic!("expected board, got {:?}", other),
            }
        }

        async fn expect_closed(&mut self) {
            assert_eq!(read_frame(&mut self.stream).await.unwrap(), None);
        }
    }

    fn connect() -> (DuplexStream, DuplexStream, TestPeer, TestPeer) {
        let (s1, c1) = tokio::io::duplex(1 << 16);
        let (s2, c2) = tokio::io::duplex(1 << 16);
        (s1, s2, TestPeer { stream: c1 }, TestPeer { stream: c2 })
    }

    /// 着手を送り、両者に届く盤面と手番通知を読む
    async fn exchange(mover: &mut TestPeer, other: &mut TestPeer, mv: &str) -> Board {
        mover.send(mv).await;
        let board = mover.recv_board().await;
        assert_eq!(other.recv_board().await, board);
        other.expect(ServerMessage::YourTurn).await;
        mover.expect(ServerMessage::OpponentTurn).await;
        board
    }

    async fn opening(p1: &mut TestPeer, p2: &mut TestPeer) {
        p1.expect(ServerMessage::YourTurn).await;
        p2.expect(ServerMessage::OpponentTurn).await;
    }

    #[tokio::test]
    async fn test_undo_after_opponent_move() {
        let mut game = Match::new(19, ForbiddenPolicy::Symmetric);
        let (s1, s2, mut p1, mut p2) = connect();

        let driver = async move {
            opening(&mut p1, &mut p2).await;
            exchange(&mut p1, &mut p2, "9,9").await;
            let board = exchange(&mut p2, &mut p1, "2,2").await;
            assert_eq!(board.get(2, 2), Ok(Cell::Stone(Stone::O)));

            p1.send("UNDO_REQUEST").await;
            p2.expect(ServerMessage::UndoResponseRequired).await;
            p2.send("UNDO_ACCEPTED").await;

            p1.expect(ServerMessage::UndoSuccessful).await;
            p2.expect(ServerMessage::UndoSuccessful).await;
            let board = p1.recv_board().await;
            assert_eq!(p2.recv_board().await, board);
            assert_eq!(board.get(2, 2), Ok(Cell::Empty));
            assert_eq!(board.get(9, 9), Ok(Cell::Stone(Stone::X)));
            p2.expect(ServerMessage::YourTurn).await;
            p1.expect(ServerMessage::OpponentTurn).await;

            // 手番は Player2 に戻っている
            exchange(&mut p2, &mut p1, "3,3").await;
        };

        let (end, ()) = tokio::join!(run_session(&mut game, s1, s2, 64), driver);
        assert_eq!(end, MatchEnd::Abandoned);
        assert_eq!(game.state(), MatchState::AwaitingPlayers);
        assert_eq!(game.board().stone_count(), 0);
    }

    #[tokio::test]
    async fn test_undo_rejected_and_sequence_errors() {
        let mut game = Match::new(19, ForbiddenPolicy::Symmetric);
        let (s1, s2, mut p1, mut p2) = connect();

        let driver = async move {
            opening(&mut p1, &mut p2).await;
            p1.send("UNDO_REQUEST").await;
            p1.expect(ServerMessage::NoPriorMove).await;

            exchange(&mut p1, &mut p2, "9,9").await;
            p1.send("UNDO_REQUEST").await;
            p1.expect(ServerMessage::NotYourTurn).await;

            p2.send("UNDO_REQUEST").await;
            p1.expect(ServerMessage::UndoResponseRequired).await;
            p2.send("UNDO_REQUEST").await;
            p2.expect(ServerMessage::UndoAlreadyPending).await;
            p2.send("4,4").await;
            p2.expect(ServerMessage::UndoPending).await;
            p2.send("UNDO_ACCEPTED").await;
            p2.expect(ServerMessage::NoPendingUndo).await;

            p1.send("UNDO_REJECTED").await;
            p2.expect(ServerMessage::UndoRejected).await;

            let board = exchange(&mut p2, &mut p1, "4,4").await;
            assert_eq!(board.stone_count(), 2);
            drop(p1);
            p2.expect_closed().await;
        };

        let (end, ()) = tokio::join!(run_session(&mut game, s1, s2, 64), driver);
        assert_eq!(end, MatchEnd::Abandoned);
    }

    #[tokio::test]
    async fn test_rejections_keep_the_turn() {
        let mut game = Match::new(19, ForbiddenPolicy::Symmetric);
        let (s1, s2, mut p1, mut p2) = connect();

        let driver = async move {
            opening(&mut p1, &mut p2).await;
            p1.send("nine,nine").await;
            p1.expect(ServerMessage::InvalidMove).await;
            p1.send("1,2,3").await;
            p1.expect(ServerMessage::InvalidMove).await;
            p1.send("19,0").await;
            p1.expect(ServerMessage::InvalidMove).await;
            p2.send("0,0").await;
            p2.expect(ServerMessage::NotYourTurn).await;

            // 三三を作る準備
            for (a, b) in [("5,6", "15,0"), ("5,7", "15,2"), ("3,5", "15,4"), ("4,5", "15,6")] {
                exchange(&mut p1, &mut p2, a).await;
                exchange(&mut p2, &mut p1, b).await;
            }
            p1.send("5,5").await;
            p1.expect(ServerMessage::ForbiddenMove).await;
            p2.send("9,9").await;
            p2.expect(ServerMessage::NotYourTurn).await;
            p1.send("15,0").await;
            p1.expect(ServerMessage::InvalidMove).await;
            let board = exchange(&mut p1, &mut p2, "9,9").await;
            assert_eq!(board.get(5, 5), Ok(Cell::Empty));
        };

        let (end, ()) = tokio::join!(run_session(&mut game, s1, s2, 64), driver);
        assert_eq!(end, MatchEnd::Abandoned);
    }

    #[tokio::test]
    async fn test_chat_relay_and_win() {
        let mut game = Match::new(19, ForbiddenPolicy::Symmetric);
        let (s1, s2, mut p1, mut p2) = connect();

        let driver = async move {
            opening(&mut p1, &mut p2).await;
            p2.send("CHAT:Player 2: good luck").await;
            p2.send("CHAT:Player 2: 1,1").await;
            assert_eq!(p1.recv().await, "CHAT:Player 2: good luck");
            assert_eq!(p1.recv().await, "CHAT:Player 2: 1,1");

            for col in 0..4 {
                exchange(&mut p1, &mut p2, &format!("0,{}", col)).await;
                exchange(&mut p2, &mut p1, &format!("10,{}", col * 2)).await;
            }
            p1.send("0,4").await;
            let board = p1.recv_board().await;
            assert_eq!(p2.recv_board().await, board);
            p1.expect(ServerMessage::Win).await;
            p2.expect(ServerMessage::Lose).await;
            p1.expect_closed().await;
            p2.expect_closed().await;
        };

        let (end, ()) = tokio::join!(run_session(&mut game, s1, s2, 64), driver);
        assert_eq!(end, MatchEnd::Won(PlayerId::Player1));
        assert_eq!(game.state(), MatchState::AwaitingPlayers);
        assert!(game.history().is_empty());
    }

    #[tokio::test]
    async fn test_win_returns_when_loser_never_reads() {
        let mut game = Match::new(19, ForbiddenPolicy::Symmetric);
        let (s1, c1) = tokio::io::duplex(1 << 16);
        // 盤面 1 枚も入らないバッファ。p2 は一度も読まない
        let (s2, c2) = tokio::io::duplex(64);
        let mut p1 = TestPeer { stream: c1 };
        let mut p2 = TestPeer { stream: c2 };

        let driver = async move {
            p1.expect(ServerMessage::YourTurn).await;
            for col in 0..4 {
                p1.send(&format!("0,{}", col)).await;
                p1.recv_board().await;
                p1.expect(ServerMessage::OpponentTurn).await;
                p2.send(&format!("10,{}", col * 2)).await;
                p1.recv_board().await;
                p1.expect(ServerMessage::YourTurn).await;
            }
            p1.send("0,4").await;
            p1.recv_board().await;
            p1.expect(ServerMessage::Win).await;
            p1.expect_closed().await;
            p2
        };

        let session = tokio::time::timeout(
            Duration::from_secs(10),
            run_session(&mut game, s1, s2, 64),
        );
        let (end, _p2) = tokio::join!(session, driver);
        assert_eq!(end.expect("session hung"), MatchEnd::Won(PlayerId::Player1));
        assert_eq!(game.state(), MatchState::AwaitingPlayers);
    }

    #[tokio::test]
    async fn test_full_board_is_a_draw() {
        let mut game = Match::new(5, ForbiddenPolicy::Off);
        let (s1, s2, mut p1, mut p2) = connect();
        let pattern = ["XXOOX", "OOXXO", "XXOOX", "OOXXO", "XXOOX"];
        let cells = |symbol: char| -> Vec<String> {
            pattern
                .iter()
                .enumerate()
                .flat_map(|(r, line)| {
                    line.chars()
                        .enumerate()
                        .filter(move |&(_, ch)| ch == symbol)
                        .map(move |(c, _)| format!("{},{}", r, c))
                })
                .collect()
        };
        let xs = cells('X');
        let os = cells('O');

        let driver = async move {
            opening(&mut p1, &mut p2).await;
            for (i, x) in xs.iter().enumerate() {
                match os.get(i) {
                    Some(o) => {
                        exchange(&mut p1, &mut p2, x).await;
                        exchange(&mut p2, &mut p1, o).await;
                    }
                    None => {
                        p1.send(x).await;
                        let board = p1.recv_board().await;
                        assert!(board.is_full());
                        assert_eq!(p2.recv_board().await, board);
                        p1.expect(ServerMessage::Draw).await;
                        p2.expect(ServerMessage::Draw).await;
                    }
                }
            }
        };

        let (end, ()) = tokio::join!(run_session(&mut game, s1, s2, 64), driver);
        assert_eq!(end, MatchEnd::Draw);
        assert_eq!(game.state(), MatchState::AwaitingPlayers);
    }
}
