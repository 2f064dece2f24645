use rustyline::{DefaultEditor, error::ReadlineError};

use fen_core::RuntimeConfig;

use crate::{evaluate, render, rpn};

fn print_repl_help() {
    eprintln!("Commands: :quit | :exit | :q, :help");
    eprintln!("Words: literals (1, 2L, 1.5, 1.5f, \"s\", 'c', true, ()), operators (+ - * / % rem ** == <> < ++ ::),");
    eprintln!("       nil empty list:N rec:a,b tag:Name as:Type dup swap pop len head tail isnil at put show force");
}

/// Continue reading when a quote is still open or the line ends with `\`.
pub(crate) fn should_continue_multiline(buf: &str) -> bool {
    let mut open: Option<char> = None;
    let mut escaped = false;
    for ch in buf.chars() {
        match open {
            Some(_) if escaped => escaped = false,
            Some(_) if ch == '\\' => escaped = true,
            Some(q) if ch == q => open = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => open = Some(ch),
            None => {}
        }
    }
    let trailing_backslash = open.is_none() && buf.trim_end().ends_with('\\');
    open.is_some() || trailing_backslash
}

pub fn run(config: &RuntimeConfig) -> anyhow::Result<()> {
    let mut rl = DefaultEditor::new()?;
    eprintln!("fen repl: postfix expressions, :help for commands");

    loop {
        let mut acc = String::new();
        loop {
            let prompt = if acc.is_empty() { ">> " } else { ".. " };
            match rl.readline(prompt) {
                Ok(line) => {
                    let trimmed = line.trim_end();

                    if acc.is_empty() && trimmed.starts_with(':') {
                        match trimmed {
                            ":quit" | ":exit" | ":q" => return Ok(()),
                            ":help" => print_repl_help(),
                            _ => eprintln!("Unknown command. Type :help for help."),
                        }
                        break;
                    }

                    if let Some(stripped) = trimmed.strip_suffix('\\')
                        && should_continue_multiline(&format!("{acc}{trimmed}"))
                    {
                        acc.push_str(stripped);
                        acc.push('\n');
                        continue;
                    }

                    acc.push_str(trimmed);
                    acc.push('\n');
                    if !should_continue_multiline(&acc) {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    acc.clear();
                    eprintln!("^C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    if acc.trim().is_empty() {
                        println!();
                        return Ok(());
                    }
                    break;
                }
                Err(e) => {
                    eprintln!("Readline error: {}", e);
                    continue;
                }
            }
        }

        let src = acc.trim_end();
        if src.trim().is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(src);

        match rpn::compile(src)
            .and_then(|program| evaluate(&program, config))
            .and_then(|value| render(&value, config, false))
        {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("Error: {e:#}"),
        }
    }
}
