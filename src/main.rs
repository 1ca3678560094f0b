#![no_std]
#![no_main]

use bsp::entry;
use defmt::*;
use defmt_rtt as _;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal_0_2::adc::{Channel, OneShot};
use panic_probe as _;

// Provide an alias for our BSP so we can switch targets quickly.
use rp_pico as bsp;

use bsp::hal::{
    adc::{Adc, AdcPin},
    clocks::{init_clocks_and_plls, Clock},
    fugit::RateExtU32,
    gpio::FunctionUart,
    pac,
    uart::{DataBits, StopBits, UartConfig, UartPeripheral},
    watchdog::Watchdog,
    Sio, Timer,
};
use light_sensor_node::config::{Config, Variant};
use light_sensor_node::sample_loop::SampleLoop;
use light_sensor_node::sensors::AnalogInput;
use light_sensor_node::xbee::XBee;

/// Factory default baud rate of the XBee
const XBEE_BAUD: u32 = 9600;

#[entry]
fn main() -> ! {
    info!("Light sensor node booting");
    // Grab our singleton objects
    let mut pac = pac::Peripherals::take().unwrap();

    // Set up the watchdog driver - needed by the clock setup code
    let mut watchdog = Watchdog::new(pac.WATCHDOG);

    // Configure the clocks
    //
    // The default is to generate a 125 MHz system clock
    let clocks = init_clocks_and_plls(
        bsp::XOSC_CRYSTAL_FREQ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .ok()
    .unwrap();

    // The single-cycle I/O block controls our GPIO pins
    let sio = Sio::new(pac.SIO);

    // Set the pins up according to their function on this particular board
    let pins = bsp::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    let delay = Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);

    // Status LED, blinks if the node gives up
    let mut led = pins.led.into_push_pull_output();

    // Set up the light sensor on ADC0
    let adc = Adc::new(pac.ADC, &mut pac.RESETS);
    let light_pin = AdcPin::new(pins.gpio26.into_floating_input()).unwrap();

    // Set up the XBee on UART0
    let uart_pins = (
        pins.gpio0.into_function::<FunctionUart>(),
        pins.gpio1.into_function::<FunctionUart>(),
    );
    let uart = UartPeripheral::new(pac.UART0, uart_pins, &mut pac.RESETS)
        .enable(
            UartConfig::new(XBEE_BAUD.Hz(), DataBits::Eight, None, StopBits::One),
            clocks.peripheral_clock.freq(),
        )
        .unwrap();

    let config = Config::default();
    info!("Variant: {}", Variant::SELECTED);

    let mut node = SampleLoop::new(
        config,
        XBee::new(uart),
        LightAdc { adc, pin: light_pin },
        delay,
    );

    match node.run() {
        Ok(never) => match never {},
        Err(e) => {
            error!("Sample loop stopped: {}", e);
            fault(&mut led, delay)
        }
    }
}

/// The ADC and the channel the light sensor is wired to
struct LightAdc<P> {
    adc: Adc,
    pin: P,
}

impl<P> AnalogInput for LightAdc<P>
where
    P: Channel<Adc>,
    Adc: OneShot<Adc, u16, P>,
{
    type Error = ();

    fn read_raw(&mut self) -> Result<u16, ()> {
        nb::block!(self.adc.read(&mut self.pin)).map_err(|_| ())
    }
}

/// Blinks the LED forever
/// param led: status LED
/// param delay: Timer instance
fn fault(led: &mut impl OutputPin, mut delay: Timer) -> ! {
    loop {
        led.set_high().unwrap();
        delay.delay_ms(500);
        led.set_low().unwrap();
        delay.delay_ms(1000);
    }
}
