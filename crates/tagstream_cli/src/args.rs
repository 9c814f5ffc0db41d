//! CLI args

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tagstream_core::{Options, Result};

/// Inspect tagstream files
#[derive(Parser)]
#[clap(version, about)]
pub(crate) struct CliArgs {
    #[clap(subcommand)]
    pub command: Command,

    #[clap(flatten)]
    pub stream: StreamArgs,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Print every value of a stream, one per line.
    Dump {
        /// The stream to read.
        file: PathBuf,

        /// Pretty-print nested values across several lines.
        #[clap(long)]
        pretty: bool,
    },

    /// Print the value count and how often each variant occurs.
    Stats {
        /// The stream to read.
        file: PathBuf,
    },
}

/// How the stream on disk was written.
#[derive(Args)]
pub(crate) struct StreamArgs {
    /// The stream is gzip-compressed.
    #[clap(short, long, global = true)]
    pub gzip: bool,

    /// Cipher algorithm the stream was encrypted with.
    #[clap(long, global = true, requires = "secret")]
    pub cipher: Option<String>,

    /// Secret the cipher key is derived from.
    #[clap(long, global = true, requires = "cipher")]
    pub secret: Option<String>,

    /// Upper bound on the items of one chunked collection.
    #[clap(long, global = true)]
    #[clap(default_value_t = i32::MAX as usize)]
    pub uncountable_max_items: usize,

    /// Size of the read buffer in bytes.
    #[clap(long, global = true)]
    #[clap(default_value_t = 0x10000)]
    pub buf_size: usize,
}

impl StreamArgs {
    pub fn options(&self) -> Result<Options> {
        let mut builder = Options::builder()
            .gzip(self.gzip)
            .uncountable_max_items(self.uncountable_max_items)
            .buf_input_size(self.buf_size);

        if let (Some(algorithm), Some(secret)) = (&self.cipher, &self.secret) {
            builder = builder.cipher(algorithm.as_str(), secret.as_bytes().to_vec());
        }
        builder.build()
    }
}
