use crate::core::{Board, BoardError, Move, PlayerId};
use crate::logic::{forbidden_kind, has_five_in_a_row, Forbidden, ForbiddenPolicy};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchState {
    AwaitingPlayers,
    InProgress,
    Finished(MatchEnd),
}

/// 対局の終わり方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchEnd {
    Won(PlayerId),
    Draw,
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// 手番が `next` に移った
    Continue { next: PlayerId },
    Won(PlayerId),
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoOutcome {
    /// 取り消された手を打ったプレイヤーに手番が戻った
    Accepted { undone: Move, turn: PlayerId },
    /// 要求を出したプレイヤー
    Rejected { requester: PlayerId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("match is not in progress")]
    NotInProgress,
    #[error("not your turn")]
    NotYourTurn,
    #[error("illegal position: {0}")]
    IllegalPosition(#[from] BoardError),
    #[error("forbidden move ({0})")]
    ForbiddenMove(Forbidden),
    #[error("an undo request is waiting for a response")]
    UndoPending,
    #[error("no move to undo")]
    NoPriorMove,
    #[error("undo already requested")]
    UndoAlreadyPending,
    #[error("no undo request to answer")]
    NoPendingUndo,
    #[error("only the opponent of the requester can answer an undo request")]
    NotUndoResponder,
}

/// 1 対局分の状態。プロセス全体で一つだけ存在し、対局ごとに reset される
#[derive(Debug, Clone)]
pub struct Match {
    board: Board,
    policy: ForbiddenPolicy,
    state: MatchState,
    current_player: PlayerId,
    history: Vec<Move>,
    pending_undo: Option<PlayerId>,
    /// 最後に確定した手の後で取り消しがすでに行われた
    undo_used: bool,
}

impl Match {
    pub fn new(board_size: usize, policy: ForbiddenPolicy) -> Self {
        Match {
            board: Board::new(board_size),
            policy,
            state: MatchState::AwaitingPlayers,
            current_player: PlayerId::Player1,
            history: Vec::new(),
            pending_undo: None,
            undo_used: false,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn state(&self) -> MatchState {
        self.state
    }

    pub fn current_player(&self) -> PlayerId {
        self.current_player
    }

    pub fn history(&self) -> &[Move] {
        &self.history
    }

    pub fn pending_undo(&self) -> Option<PlayerId> {
        self.pending_undo
    }

    /// 二人そろった: AwaitingPlayers -> InProgress
    pub fn start(&mut self) {
        self.reset();
        self.state = MatchState::InProgress;
    }

    /// AwaitingPlayers に戻し、盤と履歴を空にする
    pub fn reset(&mut self) {
        self.board = Board::new(self.board.size());
        self.state = MatchState::AwaitingPlayers;
        self.current_player = PlayerId::Player1;
        self.history.clear();
        self.pending_undo = None;
        self.undo_used = false;
    }

    /// 接続断。Finished(Abandoned) を経由して即座に reset する
    pub fn abandon(&mut self) {
        if self.state == MatchState::InProgress {
            self.state = MatchState::Finished(MatchEnd::Abandoned);
        }
        self.reset();
    }

    fn ensure_in_progress(&self) -> Result<(), MatchError> {
        match self.state {
            MatchState::InProgress => Ok(()),
            _ => Err(MatchError::NotInProgress),
        }
    }

    pub fn submit_move(
        &mut self,
        player: PlayerId,
        row: isize,
        col: isize,
    ) -> Result<MoveOutcome, MatchError> {
        self.ensure_in_progress()?;
        if player != self.current_player {
            return Err(MatchError::NotYourTurn);
        }
        if self.pending_undo.is_some() {
            return Err(MatchError::UndoPending);
        }

        let stone = player.stone();
        let pos = self.board.place(row, col, stone)?;

        if self.policy.applies_to(stone) {
            if let Some(kind) = forbidden_kind(&self.board, row, col, stone) {
                // 仮置きを戻す。手番はそのまま
                self.board.clear(pos);
                debug!(?player, %pos, %kind, "forbidden move rejected");
                return Err(MatchError::ForbiddenMove(kind));
            }
        }

        let mv = Move::new(pos, stone);
        self.history.push(mv);
        self.undo_used = false;
        debug!(?player, %mv, "move committed");

        if has_five_in_a_row(&self.board, row, col, stone) {
            self.state = MatchState::Finished(MatchEnd::Won(player));
            return Ok(MoveOutcome::Won(player));
        }
        if self.board.is_full() {
            self.state = MatchState::Finished(MatchEnd::Draw);
            return Ok(MoveOutcome::Draw);
        }

        self.current_player = player.opponent();
        Ok(MoveOutcome::Continue {
            next: self.current_player,
        })
    }

    /// 手番のプレイヤーだけが、直前の相手の手の取り消しを求められる。
    /// 取り消しは一段だけで、次の手が確定するまで再度は行えない
    pub fn request_undo(&mut self, player: PlayerId) -> Result<(), MatchError> {
        self.ensure_in_progress()?;
        if self.history.is_empty() || self.undo_used {
            return Err(MatchError::NoPriorMove);
        }
        if self.pending_undo.is_some() {
            return Err(MatchError::UndoAlreadyPending);
        }
        if player != self.current_player {
            return Err(MatchError::NotYourTurn);
        }
        self.pending_undo = Some(player);
        Ok(())
    }

    pub fn respond_undo(
        &mut self,
        player: PlayerId,
        accepted: bool,
    ) -> Result<UndoOutcome, MatchError> {
        self.ensure_in_progress()?;
        let requester = self.pending_undo.ok_or(MatchError::NoPendingUndo)?;
        if player != requester.opponent() {
            return Err(MatchError::NotUndoResponder);
        }
        self.pending_undo = None;

        if !accepted {
            return Ok(UndoOutcome::Rejected { requester });
        }

        // request_undo が履歴の存在を確認済み
        let undone = self.history.pop().ok_or(MatchError::NoPriorMove)?;
        self.board.clear(undone.pos);
        self.undo_used = true;
        self.current_player = undone.stone.owner();
        Ok(UndoOutcome::Accepted {
            undone,
            turn: self.current_player,
        })
    }
}
