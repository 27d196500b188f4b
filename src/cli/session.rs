//! Two-level menu loop: logged out, then logged in as one account

use chrono::Local;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use super::{parse_amount, MainMenuCommand, SessionCommand, BANK_NAME, MAIN_MENU, SESSION_MENU};
use crate::ledger::Ledger;
use crate::traits::AccountStore;
use crate::types::*;

/// How the logged-in menu was left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuExit {
    LoggedOut,
    InputClosed,
}

/// Interactive session reading commands from `input` and writing to `output`.
///
/// The session ends on "Exit" or when the input is exhausted. Store failures
/// abort the session and are returned to the caller.
pub struct Session<'l, S: AccountStore, R, W> {
    ledger: &'l Ledger<S>,
    input: R,
    output: W,
}

impl<'l, S, R, W> Session<'l, S, R, W>
where
    S: AccountStore,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(ledger: &'l Ledger<S>, input: R, output: W) -> Self {
        Self {
            ledger,
            input,
            output,
        }
    }

    pub async fn run(mut self) -> LedgerResult<()> {
        loop {
            self.write(MAIN_MENU).await?;
            let Some(choice) = self.prompt("Please select an option: ").await? else {
                break;
            };

            match MainMenuCommand::parse(&choice) {
                Some(MainMenuCommand::Login) => {
                    let Some(id) = self.prompt("Please enter your ID: ").await? else {
                        break;
                    };
                    let Some(pin) = self.prompt("Please enter your PIN: ").await? else {
                        break;
                    };

                    if self.ledger.login(&id, &pin).await? {
                        self.say("Login successful!").await?;
                        if self.account_menu(&id).await? == MenuExit::InputClosed {
                            break;
                        }
                    } else {
                        self.say("Login failed!\nTry again.").await?;
                    }
                }
                Some(MainMenuCommand::Exit) => {
                    self.say("Thank you for using our service.").await?;
                    break;
                }
                None => {
                    self.say("Invalid choice. Please select a valid option.")
                        .await?
                }
            }
        }
        self.output.flush().await?;
        Ok(())
    }

    async fn account_menu(&mut self, id: &str) -> LedgerResult<MenuExit> {
        loop {
            self.write(SESSION_MENU).await?;
            let Some(choice) = self.prompt("Please select an option: ").await? else {
                return Ok(MenuExit::InputClosed);
            };

            match SessionCommand::parse(&choice) {
                Some(SessionCommand::Withdraw) => {
                    let Some(amount) = self
                        .prompt_amount("Please enter the amount to withdraw: ")
                        .await?
                    else {
                        return Ok(MenuExit::InputClosed);
                    };
                    if let Some(amount) = amount {
                        let ok = self.ledger.withdraw(id, amount).await?;
                        self.report(ok, "Withdrawal").await?;
                    }
                }
                Some(SessionCommand::Deposit) => {
                    let Some(amount) = self
                        .prompt_amount("Please enter the amount to deposit: ")
                        .await?
                    else {
                        return Ok(MenuExit::InputClosed);
                    };
                    if let Some(amount) = amount {
                        let ok = self.ledger.deposit(id, amount).await?;
                        self.report(ok, "Deposit").await?;
                    }
                }
                Some(SessionCommand::Transfer) => {
                    let Some(amount) = self
                        .prompt_amount("Please enter the amount to transfer: ")
                        .await?
                    else {
                        return Ok(MenuExit::InputClosed);
                    };
                    let Some(to) = self.prompt("Please enter the ID of the recipient: ").await?
                    else {
                        return Ok(MenuExit::InputClosed);
                    };
                    if let Some(amount) = amount {
                        let ok = self.ledger.transfer(id, amount, &to).await?;
                        self.report(ok, "Transfer").await?;
                    }
                }
                Some(SessionCommand::AccountInfo) => self.account_info(id).await?,
                Some(SessionCommand::Logout) => {
                    self.say("You have logged out. Thank you for using our service.")
                        .await?;
                    return Ok(MenuExit::LoggedOut);
                }
                None => self.say("Invalid option!").await?,
            }
        }
    }

    async fn account_info(&mut self, id: &str) -> LedgerResult<()> {
        match self.ledger.account_summary(id).await? {
            Some(summary) => {
                let text = format!(
                    "----{}----\n{}\nID: {}\nYour balance is: {}\nMember since: {}",
                    BANK_NAME,
                    Local::now().format("%Y-%m-%d %H:%M:%S"),
                    summary.id,
                    summary.balance,
                    summary.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
                );
                self.say(&text).await
            }
            None => self.say("Account information unavailable!").await,
        }
    }

    async fn report(&mut self, ok: bool, action: &str) -> LedgerResult<()> {
        if ok {
            self.say(&format!("{} successful!", action)).await
        } else {
            self.say(&format!("{} failed!", action)).await
        }
    }

    /// `None` when input is closed, `Some(None)` when the amount did not parse
    async fn prompt_amount(&mut self, text: &str) -> LedgerResult<Option<Option<i64>>> {
        let Some(raw) = self.prompt(text).await? else {
            return Ok(None);
        };
        let amount = parse_amount(&raw);
        if amount.is_none() {
            self.say("Invalid amount!").await?;
        }
        Ok(Some(amount))
    }

    async fn prompt(&mut self, text: &str) -> LedgerResult<Option<String>> {
        self.write(text).await?;
        self.output.flush().await?;

        let mut line = String::new();
        if self.input.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    async fn say(&mut self, text: &str) -> LedgerResult<()> {
        self.write(text).await?;
        self.write("\n").await
    }

    async fn write(&mut self, text: &str) -> LedgerResult<()> {
        self.output.write_all(text.as_bytes()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeedConfig;
    use crate::utils::memory_storage::MemoryStorage;

    async fn run_script(ledger: &Ledger<MemoryStorage>, script: &str) -> String {
        let mut output = Vec::new();
        Session::new(ledger, script.as_bytes(), &mut output)
            .run()
            .await
            .unwrap();
        String::from_utf8(output).unwrap()
    }

    async fn seeded_ledger() -> Ledger<MemoryStorage> {
        let ledger = Ledger::new(MemoryStorage::new());
        ledger
            .seed(&SeedConfig::reference_default())
            .await
            .unwrap();
        ledger
    }

    #[tokio::test]
    async fn test_exit_immediately() {
        let ledger = seeded_ledger().await;
        let output = run_script(&ledger, "2\n").await;
        assert!(output.contains("---Welcome to Baran Bank---"));
        assert!(output.ends_with("Thank you for using our service.\n"));
    }

    #[tokio::test]
    async fn test_unknown_login_fails() {
        let ledger = seeded_ledger().await;
        let output = run_script(&ledger, "1\nNobody\n0000\n2\n").await;
        assert!(output.contains("Login failed!\nTry again."));
        assert!(!output.contains("Login successful!"));
    }

    #[tokio::test]
    async fn test_invalid_amount_does_not_touch_ledger() {
        let ledger = seeded_ledger().await;
        let output = run_script(&ledger, "1\nAli\n1234\n1\nlots\n5\n2\n").await;
        assert!(output.contains("Invalid amount!"));
        assert!(!output.contains("Withdrawal"));
        assert_eq!(ledger.balance("Ali").await.unwrap(), Some(1000));
    }

    #[tokio::test]
    async fn test_account_info_shows_balance() {
        let ledger = seeded_ledger().await;
        let output = run_script(&ledger, "1\nEce\n4321\n4\n5\n2\n").await;
        assert!(output.contains("----Baran Bank----"));
        assert!(output.contains("ID: Ece"));
        assert!(output.contains("Your balance is: 1000"));
        assert!(output.contains("You have logged out."));
    }

    #[tokio::test]
    async fn test_closed_input_ends_session() {
        let ledger = seeded_ledger().await;
        let output = run_script(&ledger, "1\nAli\n1234\n2\n").await;
        assert!(output.contains("Please enter the amount to deposit: "));
        assert_eq!(ledger.balance("Ali").await.unwrap(), Some(1000));
    }
}
