use crate::core::{Board, Cell, Stone};
use crate::network::protocol::{ServerMessage, CHAT_PREFIX};
use crossterm::style::Stylize;

/// サーバーから届いた 1 フレームを表示する
pub fn render_message(text: &str) {
    match ServerMessage::parse(text) {
        Some(ServerMessage::Board(rows)) => match Board::parse(&rows) {
            Some(board) => render_board(&board),
            None => println!("{}", text),
        },
        Some(ServerMessage::Chat(chat)) => {
            let body = chat.strip_prefix(CHAT_PREFIX).unwrap_or(chat.as_str());
            println!("{}", body.trim().cyan());
        }
        Some(msg @ ServerMessage::Role(_)) => println!("{}", msg.to_text().bold()),
        Some(ServerMessage::Win) => println!("{}", text.bold().green()),
        Some(ServerMessage::Lose) => println!("{}", text.bold().red()),
        Some(ServerMessage::YourTurn) => println!(
            "{}",
            "Your turn. (row,col | undo | accept | reject | say <text>)".bold().yellow()
        ),
        Some(ServerMessage::UndoResponseRequired) => println!(
            "{}",
            "Opponent asks to take back your last move. accept / reject?".yellow()
        ),
        Some(_) => println!("{}", text.yellow()),
        None => println!("{}", text),
    }
}

pub fn render_board(board: &Board) {
    let n = board.size();

    // 列番号 (下一桁)
    print!("    ");
    for c in 0..n {
        print!("{} ", c % 10);
    }
    println!();

    for r in 0..n {
        print!("{:>3} ", r);
        for c in 0..n {
            let cell = board.cell_at(r as isize, c as isize).unwrap_or_default();
            let symbol = cell.symbol().to_string();
            match cell {
                Cell::Empty => print!("{} ", symbol.dark_grey()),
                Cell::Stone(Stone::X) => print!("{} ", symbol.bold().red()),
                Cell::Stone(Stone::O) => print!("{} ", symbol.bold().blue()),
            }
        }
        println!();
    }
}
