use crate::core::DEFAULT_BOARD_SIZE;
use crate::logic::ForbiddenPolicy;
use anyhow::ensure;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "gomoku_config.json";

/// サーバー設定。JSON ファイルから読み、CLI 引数で上書きする
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    pub board_size: usize,
    pub forbidden_policy: ForbiddenPolicy,
    /// プレイヤーごとの送信キュー長
    pub outbound_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            addr: "127.0.0.1:5000".to_string(),
            board_size: DEFAULT_BOARD_SIZE,
            forbidden_policy: ForbiddenPolicy::default(),
            outbound_queue: 64,
        }
    }
}

impl ServerConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let config_str = std::fs::read_to_string(path)?;
        let config: ServerConfig = serde_json::from_str(&config_str)?;
        Ok(config)
    }

    /// ファイルが無いときだけ既定値。壊れた設定はエラーにする
    pub fn load_or_default(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        // 盤面フレームが u16 長に収まる範囲
        ensure!(
            (5..=99).contains(&self.board_size),
            "board_size must be between 5 and 99, got {}",
            self.board_size
        );
        ensure!(self.outbound_queue >= 1, "outbound_queue must be at least 1");
        Ok(())
    }
}
