use std::path::PathBuf;

use structopt::StructOpt;
use web3::types::Address;

#[derive(StructOpt)]
#[structopt(about = "Relayer - run options")]
pub struct RunOptions {
    #[structopt(
        long = "http-threads",
        help = "Number of threads to use for the server",
        default_value = "2"
    )]
    pub http_threads: u64,

    #[structopt(
        long = "http-port",
        help = "Port number of the server",
        default_value = "3000"
    )]
    pub http_port: u16,

    #[structopt(
        long = "http-addr",
        help = "Bind address of the server",
        default_value = "127.0.0.1"
    )]
    pub http_addr: String,
}

#[derive(StructOpt)]
#[structopt(about = "Send native currency from the relayer account")]
pub struct SendNativeOptions {
    #[structopt(short = "c", long = "chain-name")]
    pub chain_name: String,

    #[structopt(long = "recipient")]
    pub recipient: Address,

    #[structopt(long = "amount", help = "Amount in wei")]
    pub amount: String,
}

#[derive(StructOpt)]
#[structopt(about = "Relayer commands")]
pub enum RelayCommands {
    Run {
        #[structopt(flatten)]
        run_options: RunOptions,
    },
    #[structopt(about = "Resume orders left unfinished by a previous run and exit")]
    Recover,
    #[structopt(about = "Print stored state of an order")]
    Status {
        #[structopt(long = "order-id")]
        order_id: String,
    },
    SendNative {
        #[structopt(flatten)]
        send_native_options: SendNativeOptions,
    },
}

#[derive(StructOpt)]
#[structopt(about = "Gasless ERC20 transfer relayer")]
pub struct RelayOptions {
    #[structopt(
        long = "config",
        help = "Relayer configuration file",
        default_value = "config-relay.toml"
    )]
    pub config: PathBuf,

    #[structopt(subcommand)]
    pub commands: RelayCommands,
}
