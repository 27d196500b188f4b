//! Interactive ATM front end.
//!
//! This layer owns prompting and input parsing. It turns menu selections into
//! typed commands and calls one ledger operation per command; none of the
//! ledger rules live here.

pub mod session;

pub use session::Session;

pub const BANK_NAME: &str = "Baran Bank";

pub const MAIN_MENU: &str = "
---Welcome to Baran Bank---
1. Login
2. Exit
";

pub const SESSION_MENU: &str = "
1. Withdraw Money
2. Deposit Money
3. Transfer Money
4. My Account Information
5. Logout
";

/// Selection on the logged-out menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainMenuCommand {
    Login,
    Exit,
}

impl MainMenuCommand {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(Self::Login),
            "2" => Some(Self::Exit),
            _ => None,
        }
    }
}

/// Selection on the logged-in menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Withdraw,
    Deposit,
    Transfer,
    AccountInfo,
    Logout,
}

impl SessionCommand {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(Self::Withdraw),
            "2" => Some(Self::Deposit),
            "3" => Some(Self::Transfer),
            "4" => Some(Self::AccountInfo),
            "5" => Some(Self::Logout),
            _ => None,
        }
    }
}

/// Parse a typed amount; malformed input is the front end's problem, not the ledger's
pub fn parse_amount(input: &str) -> Option<i64> {
    input.trim().parse().ok()
}
