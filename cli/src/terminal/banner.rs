use colored::*;

use crate::terminal::print;

const BANNER: &str = r#"
      ___  __  __ _   _ _____     ______   ____
     / _ \|  \/  | \ | |_ _\ \   / /  _ \ / ___|
    | | | | |\/| |  \| || | \ \ / /| |_) | |
    | |_| | |  | | |\  || |  \ V / |  __/| |___
     \___/|_|  |_|_| \_|___|  \_/  |_|    \____|
"#;

pub fn print() {
    print::print(&format!("{}", BANNER.truecolor(118, 185, 0)));
}
