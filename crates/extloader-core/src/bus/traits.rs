//! Bus driver trait definitions

use crate::error::{Error, Result};
use crate::spi::FlashCommand;

use super::CancelToken;

/// Status-register polling parameters
///
/// Mirrors the automatic polling mode of QSPI/OSPI controllers: the
/// controller repeats the status read every `interval_cycles` bus cycles
/// and stops as soon as `status & mask == match_value`.
#[derive(Debug, Clone, Copy)]
pub struct AutoPoll<'a> {
    /// Bits of the status byte to compare
    pub mask: u8,
    /// Expected value of the masked bits
    pub match_value: u8,
    /// Controller cycles between two status reads
    pub interval_cycles: u16,
    /// Give up after this many milliseconds
    pub timeout_ms: u32,
    /// Optional token checked between reads
    pub cancel: Option<&'a CancelToken>,
}

impl AutoPoll<'_> {
    /// Returns true if `status` satisfies this poll
    pub const fn matches(&self, status: u8) -> bool {
        status & self.mask == self.match_value
    }
}

/// Driver for the memory-interface controller the flash hangs off
///
/// Every method blocks until the transaction is complete. All methods
/// return [`Error::Bus`] on controller or device faults and
/// [`Error::Timeout`] when a bus-level deadline expires.
///
/// ## Data phase
///
/// A [`FlashCommand`] with a non-zero `data_len` must be followed by one
/// call to [`transmit`](Self::transmit) (program, register write) or
/// [`receive`](Self::receive) (read, register read) moving exactly that
/// many bytes.
///
/// ## Memory-mapped mode
///
/// After [`enable_memory_mapped`](Self::enable_memory_mapped) the
/// controller repeats the given read command on every access to the mapped
/// window, with its timeout counter disabled. Discrete commands are
/// rejected until [`disable_memory_mapped`](Self::disable_memory_mapped).
pub trait BusDriver {
    /// Issue the instruction, address and dummy phases of a command
    fn command(&mut self, cmd: &FlashCommand) -> Result<()>;

    /// Send the data phase of the last command
    fn transmit(&mut self, data: &[u8]) -> Result<()>;

    /// Receive the data phase of the last command
    fn receive(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Poll a status register until it matches or the timeout expires
    ///
    /// `cmd` is the one-byte status read. The default implementation polls
    /// in software, once per millisecond, for controllers without a
    /// hardware auto-polling mode.
    fn auto_poll(&mut self, cmd: &FlashCommand, poll: &AutoPoll<'_>) -> Result<()> {
        let mut status = [0u8; 1];
        for _ in 0..=poll.timeout_ms {
            if poll.cancel.is_some_and(|token| token.is_cancelled()) {
                return Err(Error::Cancelled);
            }
            self.command(cmd)?;
            self.receive(&mut status)?;
            if poll.matches(status[0]) {
                return Ok(());
            }
            self.delay_ms(1);
        }
        Err(Error::Timeout)
    }

    /// Switch the controller to memory-mapped mode using `cmd` as the read
    fn enable_memory_mapped(&mut self, cmd: &FlashCommand) -> Result<()>;

    /// Leave memory-mapped mode (no-op if not mapped)
    fn disable_memory_mapped(&mut self) -> Result<()>;

    /// Read `buf.len()` bytes at device `offset` through the mapped window
    fn read_mapped(&mut self, offset: u32, buf: &mut [u8]) -> Result<()>;

    /// Wait for the specified number of milliseconds
    fn delay_ms(&mut self, ms: u32);
}

impl<B: BusDriver + ?Sized> BusDriver for &mut B {
    fn command(&mut self, cmd: &FlashCommand) -> Result<()> {
        (**self).command(cmd)
    }

    fn transmit(&mut self, data: &[u8]) -> Result<()> {
        (**self).transmit(data)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).receive(buf)
    }

    fn auto_poll(&mut self, cmd: &FlashCommand, poll: &AutoPoll<'_>) -> Result<()> {
        (**self).auto_poll(cmd, poll)
    }

    fn enable_memory_mapped(&mut self, cmd: &FlashCommand) -> Result<()> {
        (**self).enable_memory_mapped(cmd)
    }

    fn disable_memory_mapped(&mut self) -> Result<()> {
        (**self).disable_memory_mapped()
    }

    fn read_mapped(&mut self, offset: u32, buf: &mut [u8]) -> Result<()> {
        (**self).read_mapped(offset, buf)
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::AtomicBool;

    /// Bus whose status register reads `busy` for a fixed number of polls
    struct CountdownBus {
        busy_reads: u32,
        reads: u32,
        delays: u32,
    }

    impl BusDriver for CountdownBus {
        fn command(&mut self, _cmd: &FlashCommand) -> Result<()> {
            Ok(())
        }

        fn transmit(&mut self, _data: &[u8]) -> Result<()> {
            Ok(())
        }

        fn receive(&mut self, buf: &mut [u8]) -> Result<()> {
            self.reads += 1;
            buf[0] = if self.reads <= self.busy_reads { 0x01 } else { 0x00 };
            Ok(())
        }

        fn enable_memory_mapped(&mut self, _cmd: &FlashCommand) -> Result<()> {
            Ok(())
        }

        fn disable_memory_mapped(&mut self) -> Result<()> {
            Ok(())
        }

        fn read_mapped(&mut self, _offset: u32, _buf: &mut [u8]) -> Result<()> {
            Err(Error::Bus)
        }

        fn delay_ms(&mut self, ms: u32) {
            self.delays += ms;
        }
    }

    fn ready_poll(timeout_ms: u32, cancel: Option<&CancelToken>) -> AutoPoll<'_> {
        AutoPoll {
            mask: 0x01,
            match_value: 0x00,
            interval_cycles: 0x10,
            timeout_ms,
            cancel,
        }
    }

    #[test]
    fn test_software_poll_waits_for_match() {
        let mut bus = CountdownBus {
            busy_reads: 3,
            reads: 0,
            delays: 0,
        };
        let cmd = FlashCommand::simple(0x05).with_data(1);
        bus.auto_poll(&cmd, &ready_poll(10, None)).unwrap();
        assert_eq!(bus.reads, 4);
        assert_eq!(bus.delays, 3);
    }

    #[test]
    fn test_software_poll_times_out() {
        let mut bus = CountdownBus {
            busy_reads: u32::MAX,
            reads: 0,
            delays: 0,
        };
        let cmd = FlashCommand::simple(0x05).with_data(1);
        assert_eq!(bus.auto_poll(&cmd, &ready_poll(5, None)), Err(Error::Timeout));
        assert_eq!(bus.reads, 6);
    }

    #[test]
    fn test_software_poll_observes_cancellation() {
        static FLAG: AtomicBool = AtomicBool::new(true);
        let token = CancelToken::from_static(&FLAG);
        let mut bus = CountdownBus {
            busy_reads: u32::MAX,
            reads: 0,
            delays: 0,
        };
        let cmd = FlashCommand::simple(0x05).with_data(1);
        assert_eq!(
            bus.auto_poll(&cmd, &ready_poll(1_000_000, Some(&token))),
            Err(Error::Cancelled)
        );
        assert_eq!(bus.reads, 0);
    }
}
