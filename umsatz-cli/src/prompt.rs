//! PIN entry. Prompts on a terminal, reads piped stdin otherwise; the PIN
//! only ever lives in memory.

use std::io::{self, IsTerminal, Read, Write};

use anyhow::{Result, bail};

pub fn read_pin(batch: bool) -> Result<String> {
    if io::stdin().is_terminal() {
        if batch {
            bail!("--batch given but the PIN would need an interactive prompt; pipe it on stdin");
        }
        loop {
            print!("PIN: ");
            io::stdout().flush().ok();
            let mut line = String::new();
            io::stdin().read_line(&mut line)?;
            let pin = line.trim();
            if !pin.is_empty() {
                return Ok(pin.to_string());
            }
        }
    }

    let mut piped = String::new();
    io::stdin().read_to_string(&mut piped)?;
    let pin = piped.trim();
    if pin.is_empty() {
        bail!("no PIN on stdin");
    }
    Ok(pin.to_string())
}
