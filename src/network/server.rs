use crate::config::ServerConfig;
use crate::core::PlayerId;
use crate::game::Match;
use crate::network::protocol::{write_frame, ServerMessage};
use crate::network::session::run_session;
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    config.validate()?;
    let listener = TcpListener::bind(&config.addr).await?;
    info!(addr = %listener.local_addr()?, policy = ?config.forbidden_policy, "server started");
    serve(listener, config).await
}

/// 二人そろうまで接続を受け付け、1 局ずつ順番に進める。
/// 対局中に来た接続は OS の backlog で待つ
pub async fn serve(listener: TcpListener, config: ServerConfig) -> anyhow::Result<()> {
    let mut game = Match::new(config.board_size, config.forbidden_policy);

    loop {
        info!("waiting for players");
        let first = accept_player(&listener, PlayerId::Player1).await?;
        let second = accept_player(&listener, PlayerId::Player2).await?;

        let end = run_session(&mut game, first, second, config.outbound_queue).await;
        info!(?end, "players reset, waiting for new connections");
    }
}

async fn accept_player(listener: &TcpListener, player: PlayerId) -> anyhow::Result<TcpStream> {
    loop {
        let (mut socket, peer) = listener.accept().await?;
        match write_frame(&mut socket, &ServerMessage::Role(player).to_text()).await {
            Ok(()) => {
                info!(?player, %peer, "player connected");
                return Ok(socket);
            }
            Err(e) => warn!(?player, %peer, error = %e, "failed to send role"),
        }
    }
}
