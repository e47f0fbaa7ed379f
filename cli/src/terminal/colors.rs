use colored::Color;

pub const PRIMARY: Color = Color::BrightGreen;
pub const ACCENT: Color = Color::BrightCyan;
pub const SEPARATOR: Color = Color::BrightBlack;
pub const TEXT_DEFAULT: Color = Color::White;

pub const CIDR: Color = Color::BrightBlue;
pub const PORT: Color = Color::Yellow;
pub const RULE_NUMBER: Color = Color::Magenta;
pub const ALLOW: Color = Color::Green;
pub const DENY: Color = Color::Red;
