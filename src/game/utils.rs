use chess::{Board, Color, Piece, Square, ALL_SQUARES};
use std::str::FromStr;

/// Convert a chess color to a string
pub fn color_to_string(color: Color) -> String {
    match color {
        Color::White => "white".to_string(),
        Color::Black => "black".to_string(),
    }
}

/// Parse a square name like "e2", tolerating uppercase input
pub fn parse_square(name: &str) -> Option<Square> {
    Square::from_str(&name.to_lowercase()).ok()
}

/// Parse a promotion piece letter (q, r, b or n)
pub fn parse_promotion_piece(name: &str) -> Option<Piece> {
    match name.to_lowercase().as_str() {
        "q" => Some(Piece::Queen),
        "r" => Some(Piece::Rook),
        "b" => Some(Piece::Bishop),
        "n" => Some(Piece::Knight),
        _ => None,
    }
}

/// Coordinate notation for a move, with the promotion piece appended
pub fn move_notation(from: Square, to: Square, promotion: Option<Piece>) -> String {
    let suffix = match promotion {
        Some(Piece::Queen) => "q",
        Some(Piece::Rook) => "r",
        Some(Piece::Bishop) => "b",
        Some(Piece::Knight) => "n",
        _ => "",
    };
    format!("{}{}{}", from, to, suffix)
}

/// Rewrite the side-to-move field of a FEN string to White
pub fn force_white_to_move(fen: &str) -> String {
    let mut fields: Vec<&str> = fen.split_whitespace().collect();
    if fields.len() >= 2 {
        fields[1] = "w";
    }
    fields.join(" ")
}

/// Interpret a query flag value ("1" or "true") as a boolean
pub fn is_truthy_flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// Format remaining clock milliseconds for display, with tenths under ten seconds
pub fn format_clock(ms: u64) -> String {
    let total_seconds = ms / 1000;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    if ms < 10_000 {
        let tenths = (ms % 1000) / 100;
        format!("{}:{:02}.{}", minutes, seconds, tenths)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Classify a time control given in minutes
pub fn time_control_label(minutes: f64) -> &'static str {
    if minutes < 3.0 {
        "Bullet"
    } else if minutes < 10.0 {
        "Blitz"
    } else if minutes < 30.0 {
        "Rapid"
    } else {
        "Classical"
    }
}

/// Check if the board has insufficient material for checkmate
pub fn has_insufficient_material(board: &Board) -> bool {
    let mut heavy_or_pawn = 0u32;
    let mut knights = [0u32; 2];
    let mut light_bishops = [0u32; 2];
    let mut dark_bishops = [0u32; 2];

    // Count everything except the kings
    for square in ALL_SQUARES {
        if let Some(piece) = board.piece_on(square) {
            let side = match board.color_on(square) {
                Some(Color::White) => 0,
                Some(Color::Black) => 1,
                None => continue,
            };
            match piece {
                Piece::Pawn | Piece::Rook | Piece::Queen => heavy_or_pawn += 1,
                Piece::Knight => knights[side] += 1,
                Piece::Bishop => {
                    // a1 counts as a dark square
                    if (square.get_rank().to_index() + square.get_file().to_index()) % 2 == 0 {
                        dark_bishops[side] += 1;
                    } else {
                        light_bishops[side] += 1;
                    }
                }
                Piece::King => {}
            }
        }
    }

    // Any pawn, rook or queen can still mate
    if heavy_or_pawn > 0 {
        return false;
    }

    let white_minors = knights[0] + light_bishops[0] + dark_bishops[0];
    let black_minors = knights[1] + light_bishops[1] + dark_bishops[1];

    // Bare kings, or a lone minor piece against a bare king
    if white_minors + black_minors <= 1 {
        return true;
    }

    // Bishop against bishop with both on the same square color
    if knights[0] == 0 && knights[1] == 0 && white_minors == 1 && black_minors == 1 {
        return (light_bishops[0] == 1 && light_bishops[1] == 1)
            || (dark_bishops[0] == 1 && dark_bishops[1] == 1);
    }

    false
}

#[cfg(test)]
#[path = "utils_tests.rs"]
mod utils_tests;
