use colored::Colorize;
use rustyline::{error::ReadlineError, DefaultEditor};
use smartscript_parser::Document;

use crate::runner::{round_trips, token_listing, tree_outline};

pub fn playground_main() -> anyhow::Result<()> {
    print_welcome_message();

    let mut editor = setup_editor()?;
    let mut code_buffer: Vec<String> = Vec::new();

    loop {
        let prompt = if code_buffer.is_empty() { ">>> " } else { "... " };

        match editor.readline(prompt) {
            Ok(input) => {
                let trimmed_input = input.trim();

                if trimmed_input.starts_with('.') {
                    if !process_command(trimmed_input, &mut code_buffer) {
                        break;
                    }
                    continue;
                }

                editor.add_history_entry(&input).ok();
                code_buffer.push(input);
            }
            Err(ReadlineError::Interrupted) => {
                if code_buffer.is_empty() {
                    println!("\n👋 {}\n", "Bye!".green().bold());
                    break;
                }
                println!("{}", "[ss] Input cancelled.".yellow());
                code_buffer.clear();
            }
            Err(ReadlineError::Eof) => {
                println!("\n👋 {}\n", "Bye!".green().bold());
                break;
            }
            Err(err) => {
                eprintln!("\n{} {}\n", "[ss] Error: ".red().bold(), err);
                break;
            }
        }
    }

    save_history(&mut editor);
    Ok(())
}

// Returns `false` when the shell should exit.
fn process_command(input: &str, code_buffer: &mut Vec<String>) -> bool {
    let cmd = input.split_whitespace().next().unwrap_or(input);

    match cmd {
        ".parse" | "." => parse_buffer(code_buffer),
        ".tokens" | ".t" => print_tokens(code_buffer),
        ".show" | ".sh" => show_buffer(code_buffer),
        ".undo" | ".u" => undo_line(code_buffer),
        ".clear" | ".c" => clear_buffer(code_buffer),
        ".help" | ".h" => show_help(),
        ".quit" | ".q" => {
            println!("\n👋 {}\n", "Bye!".green().bold());
            return false;
        }
        _ => {
            println!("\n{} Unknown Command: {}\n", "[ss]".red(), cmd);
            println!("Use {} to find available commands\n", ".help".green());
        }
    }

    true
}

fn print_welcome_message() {
    println!("\n{}", "SmartScript Playground".blue().bold());
    println!(
        "{}",
        "Type document lines, then `.parse` (or `.`) to parse them".green()
    );
    println!("{}\n", "Type .help to find all commands".green());
}

fn setup_editor() -> anyhow::Result<DefaultEditor> {
    let mut editor = DefaultEditor::new()?;

    if let Some(history_path) = get_history_path() {
        let _ = editor.load_history(&history_path);
    }

    Ok(editor)
}

fn get_history_path() -> Option<String> {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .ok()
        .map(|home| format!("{}/.smartscript_history", home))
}

fn save_history(editor: &mut DefaultEditor) {
    if let Some(history_path) = get_history_path() {
        if let Err(err) = editor.save_history(&history_path) {
            eprintln!("Unable to save history: {}", err);
        }
    }
}

fn parse_buffer(code_buffer: &mut Vec<String>) {
    if code_buffer.is_empty() {
        println!("{} Buffer is empty", "[ss]".yellow());
        return;
    }

    let source = code_buffer.join("\n");
    match Document::from_string(&source) {
        Ok(document) => {
            println!("{}", "[ss] Tree:".cyan().bold());
            print!("{}", tree_outline(&document));
            println!("{}", "[ss] Canonical text:".cyan().bold());
            println!("{}", document.to_text());
            if !round_trips(&document) {
                println!(
                    "{}",
                    "[ss] canonical text does not parse back to the same tree".yellow()
                );
            }
            code_buffer.clear();
        }
        Err(e) => {
            println!("{}", e.pretty(&source).red());
        }
    }
}

fn print_tokens(code_buffer: &[String]) {
    let source = code_buffer.join("\n");
    match token_listing(&source) {
        Ok(listing) => print!("{listing}"),
        Err(diagnostic) => println!("{}", diagnostic.red()),
    }
}

fn show_buffer(code_buffer: &[String]) {
    if code_buffer.is_empty() {
        println!("{} Buffer is empty", "[ss]".yellow());
        return;
    }

    println!("{} {}", "[ss]".cyan(), "Current Buffer:".green().bold());

    for (i, line) in code_buffer.iter().enumerate() {
        println!("{:4}: {}", i + 1, line);
    }
}

fn undo_line(code_buffer: &mut Vec<String>) {
    match code_buffer.pop() {
        Some(line) => println!("{} Undo line: {}", "[ss]".green(), line),
        None => println!("{} Buffer is empty", "[ss]".yellow()),
    }
}

fn clear_buffer(code_buffer: &mut Vec<String>) {
    if !code_buffer.is_empty() {
        code_buffer.clear();
        println!("{} Buffer cleared", "[ss]".green());
    } else {
        println!("{} Buffer is already empty", "[ss]".yellow());
    }
}

fn show_help() {
    println!("{} Available Commands:", "[ss]".cyan());

    println!("  {:<12} - Parse the buffer, print tree and canonical text", ".parse, .");
    println!("  {:<12} - Print the tokens of the buffer", ".tokens, .t");
    println!("  {:<12} - Show current buffer", ".show, .sh");
    println!("  {:<12} - Remove the last line", ".undo, .u");
    println!("  {:<12} - Clear the buffer", ".clear, .c");
    println!("  {:<12} - Display this help information", ".help, .h");
    println!("  {:<12} - Exit shell", ".quit, .q");
    println!();
}
