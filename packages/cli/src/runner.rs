use std::{
    fmt,
    fs::read_to_string,
    io::{self, Read},
    path::PathBuf,
};

use anyhow::anyhow;
use colored::Colorize;
use smartscript_parser::{Document, Lexer, Node, Parser, ParserOptions};

use crate::{LexArgs, ParseArgs};

pub fn read_source(file_name: &str) -> anyhow::Result<String> {
    if file_name == "-" {
        let mut content = String::new();
        io::stdin().read_to_string(&mut content)?;
        return Ok(content);
    }

    let file_path = PathBuf::from(file_name);
    let content = read_to_string(&file_path)
        .map_err(|e| anyhow!("cannot read `{}`: {}", file_path.display(), e))?;
    Ok(content)
}

pub fn lex(args: &LexArgs) -> anyhow::Result<()> {
    let source = read_source(&args.file)?;
    let listing = token_listing(&source).map_err(|e| anyhow!("{e}"))?;
    print!("{listing}");
    Ok(())
}

/// One token per line, or the diagnostic of the first lex error.
pub fn token_listing(source: &str) -> Result<String, String> {
    let mut out = String::new();
    for token in Lexer::new(source) {
        let token = token.map_err(|e| e.pretty(source))?;
        out.push_str(&token.to_string());
        out.push('\n');
    }
    Ok(out)
}

pub fn parse(args: &ParseArgs) -> anyhow::Result<()> {
    let source = read_source(&args.file)?;
    let options = ParserOptions {
        allow_unclosed_blocks: args.allow_unclosed,
    };

    let document = Parser::new(&source)
        .with_options(options)
        .parse()
        .map_err(|e| anyhow!("{}", e.pretty(&source)))?;

    if !round_trips(&document) {
        tracing::warn!("canonical text does not parse back to the same tree");
        eprintln!(
            "{} {}",
            "[ss]".yellow(),
            "canonical text does not parse back to the same tree".yellow()
        );
    }

    if args.tree {
        print!("{}", tree_outline(&document));
    } else {
        print!("{}", document.to_text());
    }

    Ok(())
}

pub fn round_trips(document: &Document) -> bool {
    matches!(Document::from_string(&document.to_text()), Ok(reparsed) if &reparsed == document)
}

/// Indented outline, one node per line.
pub fn tree_outline(document: &Document) -> String {
    Outline(document).to_string()
}

struct Outline<'a>(&'a Document);

impl fmt::Display for Outline<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "document")?;
        self.0
            .children()
            .iter()
            .try_for_each(|child| write_node(f, child, 1))
    }
}

fn write_node(out: &mut fmt::Formatter<'_>, node: &Node, depth: usize) -> fmt::Result {
    let indent = "  ".repeat(depth);
    match node {
        Node::Text(text) => writeln!(out, "{indent}text {text:?}"),
        Node::Echo(elements) => {
            let elements: Vec<String> = elements
                .iter()
                .map(|e| format!("{}({})", e.value_name(), e))
                .collect();
            writeln!(out, "{indent}echo [{}]", elements.join(", "))
        }
        Node::ForLoop(for_loop) => {
            let step = for_loop
                .step()
                .map(|step| format!(" step {step}"))
                .unwrap_or_default();
            writeln!(
                out,
                "{indent}for {} from {} to {}{}",
                for_loop.variable(),
                for_loop.start(),
                for_loop.end(),
                step
            )
        }
    }?;

    node.children()
        .iter()
        .try_for_each(|child| write_node(out, child, depth + 1))
}
