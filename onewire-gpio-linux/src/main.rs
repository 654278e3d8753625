mod line;

use clap::Parser;
use embedded_hal::delay::DelayNs;
use gpio_cdev::Chip;
use onewire_gpio::{LinePull, OneWireAddress, OneWireError, OneWirePort};

use crate::line::CdevLine;

/// Enumerate the devices on a bit-banged 1-Wire bus.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the GPIO character device (e.g., /dev/gpiochip0)
    #[arg(short, long, default_value = "/dev/gpiochip0")]
    chip: String,

    /// Offset of the 1-Wire data line on the chip
    #[arg(short, long)]
    line: u32,

    /// Rely on an external pull-up resistor instead of the pin's internal one
    #[arg(short, long)]
    external_pullup: bool,

    /// Device table capacity
    #[arg(short, long, default_value_t = 16)]
    max_devices: usize,
}

/// Busy-waiting delay. Sleeping would hand the timeslot over to the
/// scheduler, whose wakeup latency dwarfs the sub-10 µs windows.
struct SpinDelay;

impl DelayNs for SpinDelay {
    fn delay_ns(&mut self, ns: u32) {
        let start = std::time::Instant::now();
        let target = std::time::Duration::from_nanos(ns as u64);
        while start.elapsed() < target {
            std::hint::spin_loop();
        }
    }
}

fn main() {
    // Initialize the logger
    env_logger::init();
    // Parse command line arguments
    let args = Args::parse();
    // Claim the data line
    let mut chip = Chip::new(&args.chip).expect("Failed to open GPIO chip");
    let line = chip.get_line(args.line).expect("Failed to get GPIO line");
    let line = CdevLine::new(line).expect("Failed to request GPIO line");
    let pull = if args.external_pullup {
        LinePull::External
    } else {
        LinePull::InternalPullUp
    };
    // Enumerate devices on the 1-Wire bus
    let mut table = vec![OneWireAddress::default(); args.max_devices];
    let mut port = OneWirePort::new(line, SpinDelay, &mut table).with_pull(pull);
    match port.search() {
        Ok(()) => {
            log::info!("Found {} devices", port.device_count());
            for device in port.devices() {
                println!("{device}");
            }
        }
        Err(OneWireError::Line(err)) => {
            log::error!("GPIO error: {err}");
            std::process::exit(1);
        }
        Err(err) => {
            log::error!("Search failed: {}", err.as_str());
            std::process::exit(1);
        }
    }
}
