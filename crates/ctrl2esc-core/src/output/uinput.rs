// ctrl2esc uinput Output Layer
// Synthetic device mirroring a grabbed physical device

use std::io;

use evdev::uinput::VirtualDeviceBuilder;
use evdev::{
    AbsInfo, AbsoluteAxisType, AttributeSet, InputEvent, MiscType, PropType, RelativeAxisType,
    SwitchType, UinputAbsSetup,
};
use smallvec::SmallVec;

use super::{EventSink, FrameBuffer};
use crate::input::{AbsoluteAxis, EvdevInput, InputDevice, PassthroughCapabilities};
use crate::Event;

/// Suffix appended to the physical device's name
pub const VIRTUAL_NAME_SUFFIX: &str = " (ctrl2esc)";

/// Virtual uinput device the rest of the system reads remapped events from.
///
/// Events are buffered until the end of their frame and written in one
/// batch, so the kernel sees exactly the framing produced by the remapper.
/// Dropping the device destroys it.
pub struct VirtualDevice {
    device: evdev::uinput::VirtualDevice,
    frame: FrameBuffer,
}

impl VirtualDevice {
    /// Create a virtual device with the identity, (restricted) key set and
    /// every non-key capability of `source`.
    pub fn mirror(source: &EvdevInput) -> io::Result<Self> {
        let raw = source.raw();
        let name = format!("{}{}", raw.name().unwrap_or("Unknown"), VIRTUAL_NAME_SUFFIX);

        let builder = VirtualDeviceBuilder::new()?
            .name(&name)
            .input_id(raw.input_id())
            .with_keys(source.keys())?;
        let device = with_passthrough(builder, source.passthrough_capabilities())?.build()?;

        log::debug!("Created virtual device '{}'", name);
        Ok(Self {
            device,
            frame: FrameBuffer::new(),
        })
    }
}

/// Advertise `caps` on `builder`. Event types the source lacks are left out.
fn with_passthrough<'a>(
    mut builder: VirtualDeviceBuilder<'a>,
    caps: &PassthroughCapabilities,
) -> io::Result<VirtualDeviceBuilder<'a>> {
    if !caps.relative_axes.is_empty() {
        let axes: AttributeSet<RelativeAxisType> =
            caps.relative_axes.iter().map(|&c| RelativeAxisType(c)).collect();
        builder = builder.with_relative_axes(&axes)?;
    }
    for axis in &caps.absolute_axes {
        builder = builder.with_absolute_axis(&abs_setup(axis))?;
    }
    if !caps.switches.is_empty() {
        let switches: AttributeSet<SwitchType> =
            caps.switches.iter().map(|&c| SwitchType(c)).collect();
        builder = builder.with_switches(&switches)?;
    }
    if !caps.misc.is_empty() {
        let misc: AttributeSet<MiscType> = caps.misc.iter().map(|&c| MiscType(c)).collect();
        builder = builder.with_msc(&misc)?;
    }
    if !caps.properties.is_empty() {
        let properties: AttributeSet<PropType> =
            caps.properties.iter().map(|&c| PropType(c)).collect();
        builder = builder.with_properties(&properties)?;
    }
    Ok(builder)
}

fn abs_setup(axis: &AbsoluteAxis) -> UinputAbsSetup {
    let info = AbsInfo::new(
        axis.value,
        axis.minimum,
        axis.maximum,
        axis.fuzz,
        axis.flat,
        axis.resolution,
    );
    UinputAbsSetup::new(AbsoluteAxisType(axis.code), info)
}

impl EventSink for VirtualDevice {
    fn write_event(&mut self, event: &Event) -> io::Result<()> {
        match self.frame.push(*event) {
            // emit() terminates every batch with its own SYN_REPORT
            Some(frame) => {
                let batch: SmallVec<[InputEvent; 8]> =
                    frame.iter().map(|e| InputEvent::from(*e)).collect();
                self.device.emit(&batch)
            }
            None => Ok(()),
        }
    }

    fn discard_frame(&mut self) -> usize {
        self.frame.discard()
    }
}
