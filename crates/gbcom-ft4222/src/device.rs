//! FT4222H enumeration and raw USB access
//!
//! FT4222H interfaces are listed per kind (SPI master, GPIO) so that a
//! caller can say "the first SPI master and the first GPIO port" without
//! knowing bus topology. [`UsbLink`] wraps one claimed interface with the
//! vendor request and bulk transfer helpers shared by the SPI and GPIO
//! drivers.

use std::fmt;
use std::time::{Duration, Instant};

use nusb::transfer::{
    Buffer, Bulk, ControlIn, ControlOut, ControlType, In, Out, Recipient, TransferError,
};
use nusb::{DeviceInfo, Endpoint, Interface, MaybeFuture};

use crate::error::{Ft4222Error, Result};
use crate::protocol::*;

/// Role of an FT4222H USB interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceKind {
    /// Interface A: SPI master
    SpiMaster,
    /// Interface B: GPIO port
    Gpio,
}

impl InterfaceKind {
    fn of(interface_number: u8) -> Self {
        if interface_number == 0 {
            InterfaceKind::SpiMaster
        } else {
            InterfaceKind::Gpio
        }
    }

    /// Interface string the chip reports for this role
    pub fn description(self) -> &'static str {
        match self {
            InterfaceKind::SpiMaster => MASTER_DESC,
            InterfaceKind::Gpio => GPIO_DESC,
        }
    }
}

impl fmt::Display for InterfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterfaceKind::SpiMaster => write!(f, "SPI"),
            InterfaceKind::Gpio => write!(f, "GPIO"),
        }
    }
}

/// One FT4222H USB interface found on the system
#[derive(Debug, Clone)]
pub struct Ft4222Interface {
    /// USB bus number
    pub bus: u8,
    /// USB device address
    pub address: u8,
    /// USB interface number
    pub interface: u8,
    /// Role of the interface
    pub kind: InterfaceKind,
    info: DeviceInfo,
}

impl fmt::Display for Ft4222Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at bus {} address {} (interface {})",
            self.kind.description(),
            self.bus,
            self.address,
            self.interface
        )
    }
}

/// List all FT4222H interfaces, in bus order
pub fn list_interfaces() -> Result<Vec<Ft4222Interface>> {
    let devices = nusb::list_devices()
        .wait()
        .map_err(|e| Ft4222Error::OpenFailed(e.to_string()))?
        .filter(|d| d.vendor_id() == FTDI_VID && d.product_id() == FT4222H_PID);

    let mut found = Vec::new();
    for info in devices {
        for iface in info.interfaces() {
            let interface = iface.interface_number();
            found.push(Ft4222Interface {
                bus: info.busnum(),
                address: info.device_address(),
                interface,
                kind: InterfaceKind::of(interface),
                info: info.clone(),
            });
        }
    }

    log::debug!("Found {} FT4222H interfaces", found.len());
    Ok(found)
}

/// Pick the `index`th interface of the given kind
pub fn find_interface(kind: InterfaceKind, index: usize) -> Result<Ft4222Interface> {
    let all = list_interfaces()?;
    if all.is_empty() {
        return Err(Ft4222Error::DeviceNotFound);
    }

    let mut matching: Vec<_> = all.into_iter().filter(|i| i.kind == kind).collect();
    let available = matching.len();
    if index >= available {
        return Err(Ft4222Error::InterfaceNotFound {
            kind,
            index,
            available,
        });
    }
    Ok(matching.swap_remove(index))
}

/// A claimed FT4222H interface with its bulk endpoints
pub(crate) struct UsbLink {
    interface: Interface,
    control_index: u16,
    in_ep: u8,
    out_ep: u8,
    timeout: Duration,
}

impl UsbLink {
    /// Open the device behind `target` and claim its interface
    pub(crate) fn open(target: &Ft4222Interface, timeout: Duration) -> Result<Self> {
        log::info!("Opening {}", target);

        let device = target
            .info
            .open()
            .wait()
            .map_err(|e| Ft4222Error::OpenFailed(e.to_string()))?;

        let config_desc = device
            .active_configuration()
            .map_err(|e| Ft4222Error::OpenFailed(format!("Failed to get config: {}", e)))?;

        let mut in_ep: Option<u8> = None;
        let mut out_ep: Option<u8> = None;
        for iface in config_desc
            .interface_alt_settings()
            .filter(|i| i.interface_number() == target.interface)
        {
            for ep in iface.endpoints() {
                if ep.transfer_type() == nusb::descriptors::TransferType::Bulk {
                    if ep.direction() == nusb::transfer::Direction::In {
                        in_ep = Some(ep.address());
                    } else {
                        out_ep = Some(ep.address());
                    }
                }
            }
        }

        let in_ep = in_ep
            .ok_or_else(|| Ft4222Error::OpenFailed("Could not find IN endpoint".to_string()))?;
        let out_ep = out_ep
            .ok_or_else(|| Ft4222Error::OpenFailed("Could not find OUT endpoint".to_string()))?;

        // LibFT4222 addresses vendor requests to index 1 on multi-interface
        // chips; the GPIO interface uses its own number.
        let control_index = match target.kind {
            InterfaceKind::SpiMaster if config_desc.num_interfaces() > 1 => 1,
            InterfaceKind::SpiMaster => 0,
            InterfaceKind::Gpio => target.interface as u16,
        };

        log::debug!(
            "Using interface {}, IN EP 0x{:02X}, OUT EP 0x{:02X}, control_index {}",
            target.interface,
            in_ep,
            out_ep,
            control_index
        );

        let interface = device
            .claim_interface(target.interface)
            .wait()
            .map_err(|e| Ft4222Error::ClaimFailed(e.to_string()))?;

        Ok(Self {
            interface,
            control_index,
            in_ep,
            out_ep,
            timeout,
        })
    }

    /// Query chip version words
    pub(crate) fn get_version(&self) -> Result<(u32, u32, u32)> {
        let data = self.control_in(FT4222_INFO_REQUEST, FT4222_GET_VERSION, 12)?;
        if data.len() < 12 {
            return Err(Ft4222Error::InvalidResponse(format!(
                "Version response too short: {} < 12",
                data.len()
            )));
        }

        let word = |i: usize| u32::from_be_bytes([data[i], data[i + 1], data[i + 2], data[i + 3]]);
        Ok((word(0), word(4), word(8)))
    }

    /// Number of chip selects available in the current chip mode
    pub(crate) fn get_num_channels(&self) -> Result<u8> {
        let data = self.control_in(FT4222_INFO_REQUEST, FT4222_GET_CONFIG, 13)?;
        let mode = *data
            .first()
            .ok_or_else(|| Ft4222Error::InvalidResponse("Empty response for config".into()))?;

        let channels = match mode {
            0 => 1,
            1 => 3,
            2 => 4,
            3 => 1,
            mode => {
                return Err(Ft4222Error::InvalidResponse(format!(
                    "Unknown mode byte: 0x{:02x}",
                    mode
                )))
            }
        };

        log::debug!("FT4222H mode: {}, channels: {}", mode, channels);
        Ok(channels)
    }

    /// Reset the chip and flush both directions
    pub(crate) fn chip_reset(&self) -> Result<()> {
        // wIndex = 0 for SIO reset, not control_index
        self.control_out(FT4222_RESET_REQUEST, FT4222_RESET_SIO, 0)?;

        for _ in 0..6 {
            if let Err(e) = self.control_out(
                FT4222_RESET_REQUEST,
                FT4222_OUTPUT_FLUSH,
                self.control_index,
            ) {
                log::warn!("FT4222 output flush failed: {}", e);
                break;
            }
        }
        if let Err(e) = self.control_out(FT4222_RESET_REQUEST, FT4222_INPUT_FLUSH, self.control_index)
        {
            log::warn!("FT4222 input flush failed: {}", e);
        }

        log::debug!("FT4222H reset complete");
        Ok(())
    }

    /// Send a config request
    ///
    /// wValue = (data << 8) | cmd, wIndex = control_index
    pub(crate) fn config_request(&self, cmd: u8, data: u8) -> Result<()> {
        let value = ((data as u16) << 8) | (cmd as u16);
        self.control_out(FT4222_CONFIG_REQUEST, value, self.control_index)
    }

    fn control_out(&self, request: u8, value: u16, index: u16) -> Result<()> {
        self.interface
            .control_out(
                ControlOut {
                    control_type: ControlType::Vendor,
                    recipient: Recipient::Device,
                    request,
                    value,
                    index,
                    data: &[],
                },
                self.timeout,
            )
            .wait()
            .map_err(|e| transfer_error("Control transfer", e))
    }

    fn control_in(&self, request: u8, value: u16, length: u16) -> Result<Vec<u8>> {
        self.interface
            .control_in(
                ControlIn {
                    control_type: ControlType::Vendor,
                    recipient: Recipient::Device,
                    request,
                    value,
                    index: self.control_index,
                    length,
                },
                self.timeout,
            )
            .wait()
            .map_err(|e| transfer_error("Control transfer", e))
    }

    /// Write data to the bulk OUT endpoint
    ///
    /// An empty write ends the SPI transaction (deasserts CS).
    pub(crate) fn bulk_write(&mut self, data: &[u8]) -> Result<()> {
        let mut out_ep: Endpoint<Bulk, Out> = self.interface.endpoint(self.out_ep)?;

        let mut out_buf = Buffer::new(data.len());
        out_buf.extend_from_slice(data);
        out_ep
            .transfer_blocking(out_buf, self.timeout)
            .into_result()
            .map_err(|e| transfer_error("Bulk write", e))?;

        log::trace!("Bulk write {:02X?}", data);
        Ok(())
    }

    /// Read exactly `len` payload bytes from the bulk IN endpoint
    ///
    /// Every IN packet starts with modem status bytes that are dropped.
    /// Gives up with [`Ft4222Error::Timeout`] once the link timeout has
    /// elapsed without collecting `len` bytes.
    pub(crate) fn bulk_read(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut in_ep: Endpoint<Bulk, In> = self.interface.endpoint(self.in_ep)?;

        let max_packet_size = in_ep.max_packet_size();
        let deadline = Instant::now() + self.timeout;
        let mut result = Vec::with_capacity(len);

        while result.len() < len {
            let remaining = len - result.len();
            let request_len = std::cmp::min(remaining + MODEM_STATUS_SIZE, READ_BUFFER_SIZE);
            let aligned_len = request_len.div_ceil(max_packet_size) * max_packet_size;

            let mut in_buf = Buffer::new(aligned_len);
            in_buf.set_requested_len(aligned_len);

            let data = in_ep
                .transfer_blocking(in_buf, self.timeout)
                .into_result()
                .map_err(|e| transfer_error("Bulk read", e))?;

            if data.len() < MODEM_STATUS_SIZE {
                return Err(Ft4222Error::InvalidResponse("Response too short".into()));
            }

            let payload = &data[MODEM_STATUS_SIZE..];
            let to_copy = std::cmp::min(payload.len(), remaining);
            result.extend_from_slice(&payload[..to_copy]);

            if result.len() < len && Instant::now() >= deadline {
                return Err(Ft4222Error::Timeout);
            }
        }

        log::trace!("Bulk read {:02X?}", result);
        Ok(result)
    }
}

fn transfer_error(what: &str, e: TransferError) -> Ft4222Error {
    match e {
        TransferError::Cancelled => Ft4222Error::Timeout,
        e => Ft4222Error::TransferFailed(format!("{} failed: {}", what, e)),
    }
}
