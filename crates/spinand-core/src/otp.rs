//! One-time-programmable page access
//!
//! The OTP area is 12 pages reached by setting SR2.OTP-E and then using the
//! ordinary page read/program commands with the OTP page index as the page
//! address. Page 0 holds the factory unique ID, page 1 the parameter page,
//! and pages 2 to 11 are user programmable once. OTP-E is always cleared
//! again before returning, on error paths too.

use crate::error::{Error, InvalidArgument, OpFailure, Operation, Result};
use crate::flash::{check_column, NandDevice, OpState};
use crate::programmer::{Clock, SpiMaster};
use crate::protocol::{self, LoadMode};
use crate::status;
use crate::wp;

/// Factory unique ID page
pub const OTP_UNIQUE_ID_PAGE: u8 = 0x00;
/// Parameter page
pub const OTP_PARAMETER_PAGE: u8 = 0x01;
/// First page open to user programming
pub const OTP_FIRST_USER_PAGE: u8 = 0x02;
/// Last OTP page
pub const OTP_LAST_PAGE: u8 = 0x0B;

impl<M: SpiMaster, C: Clock> NandDevice<M, C> {
    /// Read bytes from an OTP page
    pub fn read_otp_page(&mut self, page: u8, column: u16, buf: &mut [u8]) -> Result<()> {
        if page > OTP_LAST_PAGE {
            return Err(InvalidArgument::OtpPage(page).into());
        }
        check_column(column, buf.len())?;
        let row = page as u32;

        self.run(Operation::OtpRead, row, |dev, trace| {
            dev.in_otp_mode(|dev| {
                trace.advance(OpState::CommandIssued);
                protocol::page_data_read(&mut dev.master, row)?;
                let timeout = dev.config.read_timeout_ms;
                dev.poll(trace, Operation::OtpRead, row, timeout)?;
                let command = dev.config.read_command;
                protocol::read_data(&mut dev.master, command, column, buf)
            })
        })
    }

    /// Program bytes into a user OTP page
    ///
    /// Each page can be programmed once; there is no erase.
    pub fn program_otp_page(&mut self, page: u8, column: u16, data: &[u8]) -> Result<()> {
        if !(OTP_FIRST_USER_PAGE..=OTP_LAST_PAGE).contains(&page) {
            return Err(InvalidArgument::OtpPage(page).into());
        }
        check_column(column, data.len())?;
        let row = page as u32;

        self.run(Operation::OtpProgram, row, |dev, trace| {
            if status::read_sr2(&mut dev.master)?.is_otp_locked() {
                return Err(Error::OtpLocked);
            }

            dev.in_otp_mode(|dev| {
                trace.advance(OpState::WriteEnabling);
                wp::enable_write(&mut dev.master)?;

                trace.advance(OpState::CommandIssued);
                let io_mode = dev.config.load_io_mode();
                protocol::load_program_data(
                    &mut dev.master,
                    LoadMode::Sequential,
                    io_mode,
                    column,
                    data,
                )?;
                protocol::program_execute(&mut dev.master, row)?;

                let timeout = dev.config.program_timeout_ms;
                dev.poll(trace, Operation::OtpProgram, row, timeout)?;

                trace.advance(OpState::Verifying);
                if status::read_sr3(&mut dev.master)?.program_failed() {
                    return Err(Error::OperationFailed(OpFailure::Program { page: row }));
                }
                log::info!("Programmed OTP page 0x{:02X}", page);
                Ok(())
            })
        })
    }

    /// True once OTP-L has been set
    pub fn is_otp_locked(&mut self) -> Result<bool> {
        Ok(status::read_sr2(&mut self.master)?.is_otp_locked())
    }

    /// Permanently lock the OTP area
    pub fn lock_otp(&mut self) -> Result<()> {
        wp::lock_otp(&mut self.master)
    }

    fn in_otp_mode<T>(&mut self, body: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let result = match wp::set_otp_enable(&mut self.master, true) {
            Ok(()) => body(self),
            Err(e) => Err(e),
        };

        let exit = wp::set_otp_enable(&mut self.master, false);
        if let Err(e) = &exit {
            log::warn!("Could not clear OTP-E: {}", e);
        }

        let value = result?;
        exit?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockMaster, StepClock};

    fn device(master: MockMaster) -> NandDevice<MockMaster, StepClock> {
        NandDevice::new(master, StepClock::new(1))
    }

    #[test]
    fn test_otp_page_ranges() {
        let mut nand = device(MockMaster::new());
        let mut buf = [0u8; 4];
        assert_eq!(
            nand.read_otp_page(0x0C, 0, &mut buf),
            Err(Error::InvalidArgument(InvalidArgument::OtpPage(0x0C)))
        );
        assert_eq!(
            nand.program_otp_page(0x01, 0, &[0]),
            Err(Error::InvalidArgument(InvalidArgument::OtpPage(0x01)))
        );
        assert!(nand.master().log.is_empty());
    }

    #[test]
    fn test_otp_read_clears_enable() {
        let mut master = MockMaster::new();
        master.data.push_back(std::vec![0xEF, 0xAA]);
        let mut nand = device(master);
        let mut buf = [0u8; 2];
        nand.read_otp_page(OTP_UNIQUE_ID_PAGE, 0, &mut buf).unwrap();
        assert_eq!(buf, [0xEF, 0xAA]);
        assert_eq!(nand.master().sr[1] & 0x40, 0);
        assert!(nand.master().log.iter().any(|f| f == &[0x13, 0x00, 0x00, 0x00]));
    }

    #[test]
    fn test_otp_read_timeout_still_clears_enable() {
        let mut master = MockMaster::new();
        master.busy_after = u32::MAX;
        let mut nand = device(master);
        let mut buf = [0u8; 2];
        assert_eq!(
            nand.read_otp_page(3, 0, &mut buf),
            Err(Error::Timeout {
                op: Operation::OtpRead,
                page: 3,
            })
        );
        assert_eq!(nand.master().sr[1] & 0x40, 0);
    }

    #[test]
    fn test_otp_program_refused_when_locked() {
        let mut master = MockMaster::new();
        master.sr[1] |= 0x80;
        let mut nand = device(master);
        assert_eq!(nand.program_otp_page(2, 0, &[1, 2]), Err(Error::OtpLocked));
        assert!(!nand.master().opcodes().contains(&0x02));
    }

    #[test]
    fn test_otp_program_sequence() {
        let mut nand = device(MockMaster::new());
        nand.program_otp_page(0x0B, 0, &[0x42]).unwrap();
        let ops = nand.master().opcodes();
        assert!(ops.contains(&0x02));
        assert!(nand.master().log.iter().any(|f| f == &[0x10, 0x00, 0x00, 0x0B]));
        assert_eq!(nand.master().sr[1] & 0x40, 0);
    }
}
