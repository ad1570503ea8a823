//! spinand - W25N02KV SPI NAND tool
//!
//! Probes, inspects and exercises a W25N02KV over a raw SPI transport.
//!
//! # Architecture
//!
//! Every command opens the selected programmer as a
//! [`NandDevice`](spinand_core::flash::NandDevice) and runs on top of the
//! `spinand-core` orchestrators:
//! - **dummy** - the in-memory emulator from `spinand-dummy`, driven by a
//!   simulated clock
//! - **linux_spi** - a `/dev/spidevX.Y` controller, driven by wall time
//!
//! The bad-block table is rebuilt from the factory markers by the commands
//! that need it; nothing is persisted between runs except the markers
//! themselves.

mod cli;
mod commands;
mod programmers;

use clap::Parser;
use cli::{BbtCommands, Cli, Commands, OtpCommands, ProtectCommands};
use commands::protect::ConfigChanges;
use programmers::open_nand;
use spinand_core::config::NandConfig;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let config = match &cli.config {
        Some(path) => {
            let config = NandConfig::from_toml_file(path)?;
            log::info!("Loaded driver configuration from {}", path.display());
            config
        }
        None => NandConfig::default(),
    };
    log::debug!("{:?}", config);

    match cli.command {
        Commands::Probe { programmer } => {
            let mut nand = open_nand(&programmer, config)?;
            commands::device::run_probe(&mut nand)
        }
        Commands::Status { programmer } => {
            let mut nand = open_nand(&programmer, config)?;
            commands::device::run_status(&mut nand)
        }
        Commands::Reset {
            programmer,
            software,
        } => {
            let mut nand = open_nand(&programmer, config)?;
            commands::device::run_reset(&mut nand, software)
        }
        Commands::Erase {
            programmer,
            block,
            count,
            skip_bad,
        } => {
            let mut nand = open_nand(&programmer, config)?;
            nand.probe()?;
            commands::erase::run_erase(&mut nand, block, count, skip_bad)
        }
        Commands::Program {
            programmer,
            at,
            source,
            length,
            verify,
            skip_bad,
        } => {
            let data = commands::load_data(&source, length)?;
            let mut nand = open_nand(&programmer, config)?;
            nand.probe()?;
            commands::program::run_program(&mut nand, &at, &data, verify, skip_bad)
        }
        Commands::Read {
            programmer,
            at,
            length,
            pages,
            output,
        } => {
            let mut nand = open_nand(&programmer, config)?;
            nand.probe()?;
            commands::read::run_read(&mut nand, &at, length, pages, output.as_deref())
        }
        Commands::Verify {
            programmer,
            at,
            source,
            length,
        } => {
            let expected = commands::load_data(&source, length)?;
            let mut nand = open_nand(&programmer, config)?;
            nand.probe()?;
            commands::verify::run_verify(&mut nand, &at, &expected)
        }
        Commands::Protect(subcmd) => match subcmd {
            ProtectCommands::Status { programmer } => {
                let mut nand = open_nand(&programmer, config)?;
                commands::protect::cmd_status(&mut nand)
            }
            ProtectCommands::Unlock { programmer } => {
                let mut nand = open_nand(&programmer, config)?;
                commands::protect::cmd_unlock(&mut nand)
            }
            ProtectCommands::Range {
                programmer,
                bp,
                bottom,
            } => {
                let mut nand = open_nand(&programmer, config)?;
                commands::protect::cmd_range(&mut nand, bp, bottom)
            }
            ProtectCommands::Config {
                programmer,
                ecc,
                buffer,
                drive,
                hold_disable,
                wp_enable,
            } => {
                let mut nand = open_nand(&programmer, config)?;
                let changes = ConfigChanges {
                    ecc,
                    buffer,
                    drive,
                    hold_disable,
                    wp_enable,
                };
                commands::protect::cmd_config(&mut nand, changes)
            }
            ProtectCommands::LockSr1 { programmer, yes } => {
                let mut nand = open_nand(&programmer, config)?;
                commands::protect::cmd_lock_sr1(&mut nand, yes)
            }
        },
        Commands::Otp(subcmd) => match subcmd {
            OtpCommands::Read {
                programmer,
                page,
                length,
                output,
            } => {
                let mut nand = open_nand(&programmer, config)?;
                commands::otp::cmd_read(&mut nand, page, length, output.as_deref())
            }
            OtpCommands::Program {
                programmer,
                page,
                column,
                input,
            } => {
                let mut nand = open_nand(&programmer, config)?;
                commands::otp::cmd_program(&mut nand, page, column, &input)
            }
            OtpCommands::Lock { programmer, yes } => {
                let mut nand = open_nand(&programmer, config)?;
                commands::otp::cmd_lock(&mut nand, yes)
            }
        },
        Commands::Bbt(subcmd) => match subcmd {
            BbtCommands::Scan { programmer, toml } => {
                let mut nand = open_nand(&programmer, config)?;
                commands::bbt::cmd_scan(&mut nand, toml)
            }
            BbtCommands::List { programmer } => {
                let mut nand = open_nand(&programmer, config)?;
                commands::bbt::cmd_list(&mut nand)
            }
            BbtCommands::First { programmer } => {
                let mut nand = open_nand(&programmer, config)?;
                commands::bbt::cmd_first(&mut nand)
            }
            BbtCommands::Mark { programmer, block } => {
                let mut nand = open_nand(&programmer, config)?;
                commands::bbt::cmd_mark(&mut nand, block)
            }
        },
        Commands::ListProgrammers => {
            commands::list_programmers();
            Ok(())
        }
        Commands::ListPatterns => {
            commands::list_patterns();
            Ok(())
        }
    }
}
