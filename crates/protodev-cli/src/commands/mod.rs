// Module exports for CLI subcommands
//
// `mcp` runs the long-lived stdio server; `inspect` covers the one-shot
// subcommands that call the dispatcher once and print the result.

pub mod inspect;
pub mod mcp;
