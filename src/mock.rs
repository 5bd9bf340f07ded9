//! Host-side SX127x model used by the unit tests.
//!
//! Emulates the register file, the write-one-to-clear IRQ register and the FIFO address
//! pointer closely enough to run the link layer against it.

use std::cell::RefCell;
use std::rc::Rc;
use std::vec::Vec;

use core::convert::Infallible;

use embedded_hal::spi::{ErrorType, Operation, SpiDevice};

use crate::ack::tests::MockTimer;
use crate::event::{EventHandler, Indication};
use crate::registers::IrqFlags;
use crate::{Config, Sx127x};

pub(crate) const REG_FIFO: u8 = 0x00;
pub(crate) const REG_OP_MODE: u8 = 0x01;
pub(crate) const REG_FRF_MSB: u8 = 0x06;
pub(crate) const REG_PA_CONFIG: u8 = 0x09;
pub(crate) const REG_FIFO_ADDR_PTR: u8 = 0x0D;
pub(crate) const REG_FIFO_TX_BASE: u8 = 0x0E;
pub(crate) const REG_FIFO_RX_BASE: u8 = 0x0F;
pub(crate) const REG_FIFO_RX_CURRENT: u8 = 0x10;
pub(crate) const REG_IRQ_MASK: u8 = 0x11;
pub(crate) const REG_IRQ_FLAGS: u8 = 0x12;
pub(crate) const REG_RX_NB_BYTES: u8 = 0x13;
pub(crate) const REG_MODEM_CONFIG1: u8 = 0x1D;
pub(crate) const REG_MODEM_CONFIG2: u8 = 0x1E;
pub(crate) const REG_PAYLOAD_LENGTH: u8 = 0x22;
pub(crate) const REG_DIO_MAPPING1: u8 = 0x40;
pub(crate) const REG_VERSION: u8 = 0x42;

const MODE_MASK: u8 = 0x07;
const MODE_TRANSMITTER: u8 = 0x03;

pub(crate) struct Chip {
    regs: [u8; 0x80],
    fifo: [u8; 256],
    /// Every payload the chip was told to transmit
    pub sent: Vec<Vec<u8>>,
}

impl Chip {
    fn new() -> Self {
        let mut regs = [0u8; 0x80];
        regs[REG_OP_MODE as usize] = 0x09;
        regs[REG_FRF_MSB as usize..REG_FRF_MSB as usize + 3].copy_from_slice(&[0x6C, 0x80, 0x00]);
        regs[REG_PA_CONFIG as usize] = 0x4F;
        regs[REG_FIFO_TX_BASE as usize] = 0x80;
        regs[REG_MODEM_CONFIG1 as usize] = 0x72;
        regs[REG_MODEM_CONFIG2 as usize] = 0x70;
        regs[REG_PAYLOAD_LENGTH as usize] = 0x01;
        regs[REG_VERSION as usize] = 0x12;
        Self {
            regs,
            fifo: [0; 256],
            sent: Vec::new(),
        }
    }

    pub fn reg(&self, addr: u8) -> u8 {
        self.regs[addr as usize]
    }

    pub fn set_reg(&mut self, addr: u8, value: u8) {
        self.regs[addr as usize] = value;
    }

    pub fn fifo(&self, offset: u8, len: usize) -> &[u8] {
        &self.fifo[offset as usize..offset as usize + len]
    }

    pub fn mode(&self) -> u8 {
        self.reg(REG_OP_MODE) & MODE_MASK
    }

    /// A frame lands at the RX base address and raises RxDone
    pub fn deliver(&mut self, frame: &[u8]) {
        let base = self.reg(REG_FIFO_RX_BASE);
        for (i, b) in frame.iter().enumerate() {
            self.fifo[base.wrapping_add(i as u8) as usize] = *b;
        }
        self.set_reg(REG_FIFO_RX_CURRENT, base);
        self.set_reg(REG_RX_NB_BYTES, frame.len() as u8);
        self.raise(IrqFlags::RX_DONE);
    }

    /// The last transmitted payload comes back as a received frame
    pub fn loopback(&mut self) {
        self.set_reg(REG_FIFO_RX_CURRENT, self.reg(REG_FIFO_TX_BASE));
        self.set_reg(REG_RX_NB_BYTES, self.reg(REG_PAYLOAD_LENGTH));
    }

    pub fn raise(&mut self, flags: IrqFlags) {
        self.regs[REG_IRQ_FLAGS as usize] |= flags.bits();
    }

    /// Transmission finished, the chip falls back to standby
    pub fn finish_tx(&mut self) {
        self.regs[REG_OP_MODE as usize] = (self.reg(REG_OP_MODE) & !MODE_MASK) | 0x01;
        self.raise(IrqFlags::TX_DONE);
    }

    fn write(&mut self, addr: &mut u8, value: u8) {
        match *addr {
            REG_FIFO => {
                let ptr = self.reg(REG_FIFO_ADDR_PTR);
                self.fifo[ptr as usize] = value;
                self.set_reg(REG_FIFO_ADDR_PTR, ptr.wrapping_add(1));
                return;
            }
            REG_IRQ_FLAGS => self.regs[REG_IRQ_FLAGS as usize] &= !value,
            REG_FIFO_RX_CURRENT | REG_RX_NB_BYTES | REG_VERSION => {}
            REG_OP_MODE => {
                self.set_reg(REG_OP_MODE, value);
                if value & MODE_MASK == MODE_TRANSMITTER {
                    let base = self.reg(REG_FIFO_TX_BASE);
                    let len = self.reg(REG_PAYLOAD_LENGTH) as usize;
                    let payload = self.fifo(base, len).to_vec();
                    self.sent.push(payload);
                }
            }
            other => self.set_reg(other, value),
        }
        *addr += 1;
    }

    fn read(&mut self, addr: &mut u8) -> u8 {
        if *addr == REG_FIFO {
            let ptr = self.reg(REG_FIFO_ADDR_PTR);
            self.set_reg(REG_FIFO_ADDR_PTR, ptr.wrapping_add(1));
            return self.fifo[ptr as usize];
        }
        let value = self.reg(*addr);
        *addr += 1;
        value
    }
}

#[derive(Clone)]
pub(crate) struct MockSpi(pub Rc<RefCell<Chip>>);

impl ErrorType for MockSpi {
    type Error = Infallible;
}

impl SpiDevice for MockSpi {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        let mut chip = self.0.borrow_mut();
        let mut header: Option<(bool, u8)> = None;

        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => {
                    for &byte in bytes.iter() {
                        match header.as_mut() {
                            None => header = Some((byte & 0x80 != 0, byte & 0x7F)),
                            Some((true, addr)) => chip.write(addr, byte),
                            Some((false, _)) => {}
                        }
                    }
                }
                Operation::Read(buf) => {
                    if let Some((false, addr)) = header.as_mut() {
                        for slot in buf.iter_mut() {
                            *slot = chip.read(addr);
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub(crate) struct Recorder {
    pub events: Vec<Indication>,
}

impl EventHandler for Recorder {
    fn on_event(&mut self, indication: Indication) {
        self.events.push(indication);
    }
}

pub(crate) type TestRadio = Sx127x<MockSpi, MockTimer, Recorder>;

pub(crate) fn radio_with(config: Config) -> (TestRadio, Rc<RefCell<Chip>>) {
    let chip = Rc::new(RefCell::new(Chip::new()));
    let radio = Sx127x::new(
        MockSpi(chip.clone()),
        MockTimer::default(),
        Recorder::default(),
        config,
    );
    (radio, chip)
}

pub(crate) fn radio() -> (TestRadio, Rc<RefCell<Chip>>) {
    radio_with(Config::default())
}
