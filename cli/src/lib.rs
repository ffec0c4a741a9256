pub mod cli;
pub mod error;
pub mod render;

use cli::{Cli, Format};
use error::CliError;
use linter_core::{BorrowedSource, Diagnostics, ScopeArena, Source};

/// Loads the optional prelude, then the main file, through the same pipeline — the prelude's
/// finished scope tree becomes the parent of the main file's root scope. Exit status never
/// reflects diagnostic count; only the two read failures below are hard errors.
pub fn run(args: &Cli) -> Result<(), CliError> {
    let builtin_arena: Option<ScopeArena> = match &args.builtins {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|source| CliError::ReadPrelude { path: path.clone(), source })?;
            let source = BorrowedSource::new(&text);
            let mut diags = Vec::new();
            let out = {
                let mut diag = Diagnostics::collecting(&mut diags);
                linter_core::parse(&source, None, &mut diag)
            };
            for d in &diags {
                print_diag(d, args.format, &source);
            }
            Some(out.scopes)
        }
        None => None,
    };

    let text = std::fs::read_to_string(&args.source)
        .map_err(|source| CliError::ReadSource { path: args.source.clone(), source })?;
    let source = BorrowedSource::new(&text);
    let mut diags = Vec::new();
    {
        let mut diag = Diagnostics::collecting(&mut diags);
        linter_core::parse(&source, builtin_arena.as_ref(), &mut diag);
    }

    for d in &diags {
        print_diag(d, args.format, &source);
    }

    Ok(())
}

pub fn print_diag(d: &linter_core::Diag, format: Format, source: &dyn Source) {
    match format {
        Format::Tool => println!("{}", render::render_tool(d)),
        Format::Fancy => println!("{}", render::render_fancy(d, source)),
    }
}
