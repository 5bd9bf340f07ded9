//! IEEE 802.15.4 radio HAL on top of the SX127x LoRa modem
//!
//! [`Sx127x`] owns everything the link layer knows about one radio: the bus, the protocol
//! state, the address filter configuration and the ACK deadline. It exposes the operation
//! set the MAC drives (`request_op`/`confirm_op`, `write`/`read`, PHY and filter
//! configuration) and reacts to chip interrupts delivered as [`Event`]s.
//!
//! # State machine
//! ```text
//!            SetReceive               DIO0 (RxDone, frame needs ACK)
//!   IDLE ───────────────► RX_RUNNING ───────────────► ACK armed
//!    ▲  ◄─── SetIdle/Cca ──┘   │  ▲                       │ AckTimeout
//!    │                Transmit │  └── DIO0 (rejected) ─┘   ▼
//!    └──────── DIO0 (TxDone) ── TX_RUNNING ◄──────────────┘
//! ```
//!
//! A TxDone that ends an automatic ACK raises [`Indication::RxDone`] for the acknowledged
//! frame. The ACK itself is never visible to the upper layer.

use embedded_hal::spi::SpiDevice;
use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::ack::{AckScheduler, AckTimer};
use crate::config::{Config, PaSelect};
use crate::event::{Event, EventHandler, EventQueue, Indication};
use crate::filter::LinkAddresses;
use crate::frame::{self, MacHeader, MAX_FRAME_LEN, MIN_FRAME_LEN};
use crate::log::{debug, info, warn};
use crate::op::{
    AddressFilter, Capabilities, CcaMode, Confirmation, FilterMode, Op, PendingOp, TxStatus,
};
use crate::registers::{
    CarrierFrequency, Dio0Mapping, DioMapping1, FifoAddrPtr, FifoRxBaseAddr, FifoRxCurrentAddr,
    FifoTxBaseAddr, IrqFlags, IrqMask, IrqStatus, Mode, OpMode, OpModeFlags, PaConfig,
    PayloadLength, RxNbBytes, Version,
};
use crate::{Device, Error};

/// Silicon revisions this driver knows how to drive
const SUPPORTED_VERSIONS: [u8; 2] = [0x12, 0x22];

/// Protocol state of the link layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioState {
    /// Neither transmitting nor receiving
    #[default]
    Idle,
    RxRunning,
    TxRunning,
}

/// Copy of a received frame kept in RAM while its ACK occupies the FIFO
struct FrameBuffer {
    bytes: [u8; MAX_FRAME_LEN],
    len: Option<usize>,
}

impl FrameBuffer {
    const fn new() -> Self {
        Self {
            bytes: [0; MAX_FRAME_LEN],
            len: None,
        }
    }

    fn store(&mut self, frame: &[u8]) {
        let len = frame.len().min(MAX_FRAME_LEN);
        self.bytes[..len].copy_from_slice(&frame[..len]);
        self.len = Some(len);
    }

    fn len(&self) -> Option<usize> {
        self.len
    }

    fn bytes(&self) -> &[u8] {
        &self.bytes[..self.len.unwrap_or(0)]
    }

    fn clear(&mut self) {
        self.len = None;
    }
}

/// Link-layer driver for one SX127x radio
pub struct Sx127x<SPI, T, H> {
    pub(crate) device: Device<SPI>,
    ack: AckScheduler<T>,
    handler: H,
    config: Config,
    state: RadioState,
    addresses: LinkAddresses,
    /// Sequence number of the frame being acknowledged
    seq_num: u8,
    /// The transmission in progress is an automatic ACK
    ack_in_flight: bool,
    /// Drop received ACKs instead of indicating them
    ack_filter: bool,
    promiscuous: bool,
    /// Channel activity was reported by the chip since the last retune
    cad_detected: bool,
    acked_frame: FrameBuffer,
    pending: PendingOp,
    frequency_hz: u32,
    power_dbm: i8,
}

impl<SPI, T, H> Sx127x<SPI, T, H>
where
    SPI: SpiDevice,
    T: AckTimer,
    H: EventHandler,
{
    /// Creates the driver. No bus traffic happens until [`Sx127x::request_on`].
    ///
    /// # Arguments
    /// * `spi` - SPI device the transceiver is attached to
    /// * `timer` - One-shot timer used for the ACK turnaround
    /// * `handler` - Receives the indications raised to the upper layer
    /// * `config` - Band plan, power range and ACK behaviour
    pub fn new(spi: SPI, timer: T, handler: H, config: Config) -> Self {
        let mut radio = Self {
            device: Device::new(spi),
            ack: AckScheduler::new(timer),
            handler,
            config,
            state: RadioState::Idle,
            addresses: LinkAddresses::default(),
            seq_num: 0,
            ack_in_flight: false,
            ack_filter: false,
            promiscuous: false,
            cad_detected: false,
            acked_frame: FrameBuffer::new(),
            pending: PendingOp::None,
            frequency_hz: config.channel_base_hz,
            power_dbm: 0,
        };
        radio.apply_filter_mode(FilterMode::default());
        radio
    }

    /// Current protocol state
    pub fn state(&self) -> RadioState {
        self.state
    }

    /// Configuration the driver was created with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Addresses the link-layer filter currently accepts
    pub fn addresses(&self) -> &LinkAddresses {
        &self.addresses
    }

    /// Upper layer callback
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Upper layer callback, mutably
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// ACK deadline state and the timer behind it
    pub fn ack_scheduler(&self) -> &AckScheduler<T> {
        &self.ack
    }

    /// Carrier frequency programmed by the last successful [`Sx127x::config_phy`]
    pub fn frequency(&self) -> u32 {
        self.frequency_hz
    }

    /// Transmit power programmed by the last successful [`Sx127x::config_phy`]
    pub fn tx_power(&self) -> i8 {
        self.power_dbm
    }

    /// Releases the bus, the timer and the handler
    pub fn release(self) -> (SPI, T, H) {
        let Self {
            device, ack, handler, ..
        } = self;
        (device.release(), ack.into_timer(), handler)
    }

    /// Features advertised to the upper layer.
    ///
    /// The radio is announced as a sub-GHz BPSK PHY so 802.15.4 stacks pick matching
    /// timings, the modulation on air is LoRa.
    pub fn caps(&self) -> Capabilities {
        Capabilities::SUB_GHZ
            | Capabilities::IRQ_CRC_ERROR
            | Capabilities::IRQ_TX_DONE
            | Capabilities::IRQ_CCA_DONE
            | Capabilities::PHY_BPSK
    }

    /// Powers the transceiver up in LoRa mode.
    ///
    /// # Errors
    /// * `Error::UnknownChip` - the version register does not identify an SX127x, usually
    ///   because no chip answers on the bus
    pub fn request_on(&mut self) -> Result<(), Error> {
        let version: Version = self.device.read_register()?;
        if !SUPPORTED_VERSIONS.contains(&version.value) {
            return Err(Error::UnknownChip(version.value));
        }
        info!("sx127x: version {=u8:#x}", version.value);

        // The modem can only be switched while asleep
        self.device.write_register(OpMode {
            flags: OpModeFlags::empty(),
            mode: Mode::Sleep,
        })?;
        self.device.write_register(OpMode::lora(Mode::Sleep))?;
        self.device.write_register(OpMode::lora(Mode::Standby))?;
        self.state = RadioState::Idle;
        Ok(())
    }

    /// Power-up completes synchronously in [`Sx127x::request_on`]
    pub fn confirm_on(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Puts the chip to sleep and drops any pending ACK
    pub fn off(&mut self) -> Result<(), Error> {
        self.abort_ack();
        self.acked_frame.clear();
        self.device
            .modify_register(|op_mode: OpMode| op_mode.with_mode(Mode::Sleep))?;
        self.state = RadioState::Idle;
        Ok(())
    }

    /// Starts `op` and returns without waiting for the hardware.
    ///
    /// Completion is signalled through the [`EventHandler`], the outcome is then collected
    /// with [`Sx127x::confirm_op`]. Requesting [`Op::Transmit`] while a transmission is in
    /// progress is a caller error.
    ///
    /// Every operation changes the chip mode, so an ACK that is scheduled or on air is
    /// abandoned.
    pub fn request_op(&mut self, op: Op) -> Result<(), Error> {
        self.abort_ack();
        self.pending.request(op);
        match op {
            Op::Transmit => {
                if self.state == RadioState::TxRunning {
                    warn!("sx127x: transmit requested while transmitting");
                }
                self.start_transmit()?;
            }
            Op::SetReceive => {
                self.start_receive()?;
                self.pending.indicate(op);
            }
            Op::SetIdle => {
                self.set_standby()?;
                self.pending.indicate(op);
            }
            Op::Cca => {
                // No carrier sense: the channel is reported from `cad_detected` only
                self.set_standby()?;
                self.pending.indicate(op);
                self.handler.on_event(Indication::CcaDone);
            }
        }
        Ok(())
    }

    /// Collects the outcome of `op`.
    ///
    /// # Errors
    /// * `Error::NotIndicated` - `op` is still running
    /// * `Error::NotRequested` - `op` was never requested or was already confirmed
    pub fn confirm_op(&mut self, op: Op) -> Result<Confirmation, Error> {
        self.pending.confirm(op)?;
        Ok(match op {
            Op::Transmit => Confirmation::Transmit(if self.cad_detected {
                TxStatus::MediumBusy
            } else {
                TxStatus::Success
            }),
            Op::SetReceive => Confirmation::SetReceive,
            Op::SetIdle => Confirmation::SetIdle,
            Op::Cca => Confirmation::Cca(!self.cad_detected),
        })
    }

    /// Loads a frame into the FIFO from an ordered list of fragments. Empty fragments are
    /// skipped, and a list with nothing to send leaves the chip untouched.
    ///
    /// # Errors
    /// * `Error::FrameTooLong` - the fragments add up to more than [`MAX_FRAME_LEN`]
    pub fn write(&mut self, fragments: &[&[u8]]) -> Result<(), Error> {
        let len: usize = fragments.iter().map(|f| f.len()).sum();
        if len > MAX_FRAME_LEN {
            return Err(Error::FrameTooLong { len });
        }
        if len == 0 {
            return Ok(());
        }
        self.load_fifo(len as u8, fragments)
    }

    /// Copies the received frame into `buf` and returns its length.
    ///
    /// With `buf` set to `None` only the length is returned. The FIFO pointers are reset
    /// whenever nothing is copied so the chip can keep receiving.
    ///
    /// # Errors
    /// * `Error::BufferTooSmall` - the frame is longer than `buf`
    /// * `Error::MalformedFrame` - the frame is shorter than [`MIN_FRAME_LEN`]
    pub fn read(&mut self, buf: Option<&mut [u8]>) -> Result<usize, Error> {
        let len = match self.acked_frame.len() {
            Some(len) => len,
            None => self.read_rx_len()?,
        };
        let max = buf.as_ref().map_or(usize::MAX, |b| b.len());

        if len > max {
            self.reset_fifo_pointers()?;
            return Err(Error::BufferTooSmall { len, max });
        }
        if len < MIN_FRAME_LEN {
            self.reset_fifo_pointers()?;
            return Err(Error::MalformedFrame { len });
        }
        let Some(buf) = buf else {
            self.reset_fifo_pointers()?;
            return Ok(len);
        };

        if self.acked_frame.len().is_some() {
            buf[..len].copy_from_slice(self.acked_frame.bytes());
            self.acked_frame.clear();
            return Ok(len);
        }

        let current: FifoRxCurrentAddr = self.device.read_register()?;
        self.device.write_register(FifoAddrPtr {
            address: current.address,
        })?;
        self.device.read_fifo(&mut buf[..len])?;
        Ok(len)
    }

    /// Length of the frame waiting to be read
    pub fn len(&mut self) -> Result<usize, Error> {
        match self.acked_frame.len() {
            Some(len) => Ok(len),
            None => self.read_rx_len(),
        }
    }

    /// Tunes to `channel` and sets the transmit power.
    ///
    /// The carrier is `channel_base_hz + channel * channel_spacing_hz`. Nothing is written
    /// unless both values are valid.
    ///
    /// # Errors
    /// * `Error::ChannelOutOfRange` - `channel` is above [`Config::max_channel`]
    /// * `Error::PowerOutOfRange` - `power_dbm` is outside the configured range
    pub fn config_phy(&mut self, channel: u8, power_dbm: i8) -> Result<(), Error> {
        let frequency_hz = self
            .config
            .channel_frequency(channel)
            .ok_or(Error::ChannelOutOfRange(channel))?;
        if !self.config.power_in_range(power_dbm) {
            return Err(Error::PowerOutOfRange(power_dbm));
        }

        self.device
            .write_register(CarrierFrequency::from_hz(frequency_hz))?;
        self.device
            .write_register(pa_config(self.config.pa_select, power_dbm))?;

        debug!("sx127x: channel {=u8} at {=u32} Hz, {=i8} dBm", channel, frequency_hz, power_dbm);
        self.frequency_hz = frequency_hz;
        self.power_dbm = power_dbm;
        self.cad_detected = false;
        Ok(())
    }

    /// Updates the addresses the link-layer filter accepts.
    ///
    /// # Errors
    /// * `Error::Unsupported` - for [`AddressFilter::PanCoordinator`]
    pub fn config_addr_filter(&mut self, cmd: AddressFilter) -> Result<(), Error> {
        match cmd {
            AddressFilter::ShortAddr(addr) => self.addresses.short_addr = addr,
            AddressFilter::ExtAddr(addr) => self.addresses.ext_addr = addr,
            AddressFilter::PanId(pan) => self.addresses.pan_id = pan,
            AddressFilter::PanCoordinator(_) => return Err(Error::Unsupported),
        }
        Ok(())
    }

    /// Selects how received frames are filtered.
    ///
    /// # Arguments
    /// * `mode` - [`FilterMode::Promiscuous`] bypasses the address filter and disables
    ///   automatic ACKs, [`FilterMode::AckOnly`] lets received ACKs through to the upper layer
    pub fn set_frame_filter_mode(&mut self, mode: FilterMode) -> Result<(), Error> {
        self.apply_filter_mode(mode);
        Ok(())
    }

    /// Accepted and ignored, CCA never measures energy
    pub fn set_cca_threshold(&mut self, _threshold_dbm: i8) -> Result<(), Error> {
        Ok(())
    }

    /// Accepted and ignored, CCA never measures energy or carrier
    pub fn set_cca_mode(&mut self, _mode: CcaMode) -> Result<(), Error> {
        Ok(())
    }

    /// Source address matching for frame pending bits is not available
    pub fn config_src_addr_match(&mut self) -> Result<(), Error> {
        Err(Error::Unsupported)
    }

    /// CSMA-CA is left to the MAC
    pub fn set_csma_params(&mut self, _min_be: u8, _max_be: u8, _retries: i8) -> Result<(), Error> {
        Err(Error::Unsupported)
    }

    /// Reacts to one event. Must run on the task that owns the radio, never in interrupt
    /// context.
    ///
    /// # Errors
    /// * `Error::Bus` - SPI communication failed while servicing the event
    pub fn handle_event(&mut self, event: Event) -> Result<(), Error> {
        match event {
            Event::Dio0 => self.on_interrupt(),
            Event::AckTimeout => self.on_ack_timeout(),
        }
    }

    /// Handles every queued event, oldest first, then returns
    pub fn process<M: RawMutex, const N: usize>(
        &mut self,
        queue: &EventQueue<M, N>,
    ) -> Result<(), Error> {
        while let Some(event) = queue.try_next() {
            self.handle_event(event)?;
        }
        Ok(())
    }

    /// Waits for at least one event, then handles everything queued
    pub async fn wait_and_process<M: RawMutex, const N: usize>(
        &mut self,
        queue: &EventQueue<M, N>,
    ) -> Result<(), Error> {
        let event = queue.next().await;
        self.handle_event(event)?;
        self.process(queue)
    }

    fn abort_ack(&mut self) {
        if self.ack.is_armed() || self.ack_in_flight {
            debug!("sx127x: pending ACK dropped");
        }
        self.ack.disarm();
        self.ack_in_flight = false;
    }

    fn apply_filter_mode(&mut self, mode: FilterMode) {
        let (ack_filter, promiscuous) = match mode {
            FilterMode::Accept => (true, false),
            FilterMode::Promiscuous => (true, true),
            FilterMode::AckOnly => (false, false),
        };
        self.ack_filter = ack_filter;
        self.promiscuous = promiscuous;
    }

    fn read_rx_len(&mut self) -> Result<usize, Error> {
        let count: RxNbBytes = self.device.read_register()?;
        Ok(count.count as usize)
    }

    fn reset_fifo_pointers(&mut self) -> Result<(), Error> {
        self.device.write_register(FifoRxBaseAddr { address: 0 })?;
        self.device.write_register(FifoAddrPtr { address: 0 })?;
        Ok(())
    }

    /// Programs the payload length and stages `fragments` at FIFO offset 0
    fn load_fifo(&mut self, len: u8, fragments: &[&[u8]]) -> Result<(), Error> {
        self.device.write_register(PayloadLength { length: len })?;
        self.device.write_register(FifoTxBaseAddr { address: 0 })?;
        self.device.write_register(FifoAddrPtr { address: 0 })?;
        for fragment in fragments.iter().filter(|f| !f.is_empty()) {
            self.device.write_fifo(fragment)?;
        }
        Ok(())
    }

    fn set_standby(&mut self) -> Result<(), Error> {
        self.device
            .modify_register(|op_mode: OpMode| op_mode.with_mode(Mode::Standby))?;
        self.state = RadioState::Idle;
        Ok(())
    }

    fn start_transmit(&mut self) -> Result<(), Error> {
        self.device.write_register(IrqMask::only(IrqFlags::TX_DONE))?;
        self.device
            .modify_register(|dio: DioMapping1| dio.with_dio0(Dio0Mapping::TxDone))?;
        self.state = RadioState::TxRunning;
        self.device
            .modify_register(|op_mode: OpMode| op_mode.with_mode(Mode::Transmitter))?;
        Ok(())
    }

    /// Listens continuously, so no RX timeout applies
    fn start_receive(&mut self) -> Result<(), Error> {
        self.drop_stale_frame();
        self.device
            .write_register(IrqMask::only(IrqFlags::RX_DONE | IrqFlags::PAYLOAD_CRC_ERROR))?;
        self.device
            .modify_register(|dio: DioMapping1| dio.with_dio0(Dio0Mapping::RxDone))?;
        self.reset_fifo_pointers()?;
        self.state = RadioState::RxRunning;
        self.device
            .modify_register(|op_mode: OpMode| op_mode.with_mode(Mode::RxContinuous))?;
        Ok(())
    }

    fn on_interrupt(&mut self) -> Result<(), Error> {
        let status: IrqStatus = self.device.read_register()?;
        let flags = status.flags;

        if flags.contains(IrqFlags::CAD_DETECTED) {
            self.cad_detected = true;
            self.device.write_register(IrqStatus::clear(
                IrqFlags::CAD_DETECTED | IrqFlags::CAD_DONE,
            ))?;
        }

        if flags.intersects(IrqFlags::TX_DONE | IrqFlags::RX_DONE) {
            match self.state {
                RadioState::RxRunning => self.on_rx_interrupt(flags)?,
                RadioState::TxRunning => self.on_tx_done()?,
                RadioState::Idle => {
                    debug!("sx127x: interrupt while idle");
                }
            }
        }
        Ok(())
    }

    fn on_rx_interrupt(&mut self, flags: IrqFlags) -> Result<(), Error> {
        if flags.contains(IrqFlags::PAYLOAD_CRC_ERROR) {
            self.device.write_register(IrqStatus::clear(
                IrqFlags::PAYLOAD_CRC_ERROR | IrqFlags::RX_DONE,
            ))?;
            self.drop_stale_frame();
            self.handler.on_event(Indication::CrcError);
            return Ok(());
        }

        self.device
            .write_register(IrqStatus::clear(IrqFlags::RX_DONE))?;

        let len = self.read_rx_len()?;
        let current: FifoRxCurrentAddr = self.device.read_register()?;
        self.device.write_register(FifoAddrPtr {
            address: current.address,
        })?;

        let mut rxbuf = [0u8; MAX_FRAME_LEN];
        let in_bounds = (MIN_FRAME_LEN..=MAX_FRAME_LEN).contains(&len);
        if in_bounds {
            self.device.read_fifo(&mut rxbuf[..len])?;
        }

        if self.promiscuous {
            self.indicate_rx();
            return Ok(());
        }

        if !in_bounds {
            warn!("sx127x: dropping frame of {=usize} bytes", len);
            return self.start_receive();
        }

        let frame = &rxbuf[..len];
        let mhr = MacHeader::new(frame);

        if self.addresses.accepts(&mhr) {
            if mhr.ack_requested() && self.config.auto_ack {
                self.seq_num = mhr.sequence_number().unwrap_or(0);
                self.acked_frame.store(frame);
                self.ack.arm(self.config.ack_reply_us);
                debug!("sx127x: frame {=u8} needs an ACK", self.seq_num);
            } else {
                self.indicate_rx();
            }
        } else if mhr.is_imm_ack() && !self.ack_filter {
            self.indicate_rx();
        } else {
            debug!("sx127x: frame filtered");
            self.start_receive()?;
        }
        Ok(())
    }

    fn on_tx_done(&mut self) -> Result<(), Error> {
        self.device
            .write_register(IrqStatus::clear(IrqFlags::TX_DONE))?;
        self.state = RadioState::Idle;

        if self.ack_in_flight {
            self.ack_in_flight = false;
            self.ack.disarm();
            debug!("sx127x: ACK sent");
            self.handler.on_event(Indication::RxDone);
        } else {
            self.pending.indicate(Op::Transmit);
            self.handler.on_event(Indication::TxDone);
        }
        Ok(())
    }

    fn on_ack_timeout(&mut self) -> Result<(), Error> {
        if !self.ack.expire() {
            debug!("sx127x: stale ACK timeout");
            return Ok(());
        }

        self.set_standby()?;
        self.ack_in_flight = true;
        let ack = frame::imm_ack(self.seq_num);
        self.load_fifo(ack.len() as u8, &[&ack])?;
        self.start_transmit()
    }

    /// Forgets the copy of an acknowledged frame unless its ACK is still pending
    fn drop_stale_frame(&mut self) {
        if !self.ack.is_armed() && !self.ack_in_flight {
            self.acked_frame.clear();
        }
    }

    /// RX_DONE for a frame still sitting in the FIFO
    fn indicate_rx(&mut self) {
        self.acked_frame.clear();
        self.handler.on_event(Indication::RxDone);
    }
}

/// PaConfig value for `dbm` on the selected output
fn pa_config(pa_select: PaSelect, dbm: i8) -> PaConfig {
    match pa_select {
        // Pmax = 15 dBm above 0 dBm, 10.8 dBm at and below
        PaSelect::Rfo if dbm > 0 => PaConfig {
            pa_boost: false,
            max_power: 7,
            output_power: dbm.min(15) as u8,
        },
        PaSelect::Rfo => PaConfig {
            pa_boost: false,
            max_power: 0,
            output_power: (dbm.max(-4) + 4) as u8,
        },
        PaSelect::PaBoost => PaConfig {
            pa_boost: true,
            max_power: 7,
            output_power: (dbm.clamp(2, 17) - 2) as u8,
        },
    }
}
