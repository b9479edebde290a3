//! remote I/O module emulated on an esp32 uart, with one analog channel following a ramp

#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]

use esp_backtrace as _;
use esp_hal::{
    clock::CpuClock,
    timer::timg::TimerGroup,
    uart::{DataBits, Parity, StopBits, RxConfig},
};
use embassy_executor::Spawner;
use embassy_time::{Delay, Duration, Timer};
use embassy_futures::join::join;
use esp_println as _;
use log::*;

use uartrio::{
    responder::Responder,
    store::ChannelStore,
    };


esp_bootloader_esp_idf::esp_app_desc!();

/// analog channel driven by the ramp task, 1-based
const RAMP: u16 = 1;
/// discrete signal toggled along with the ramp
const HEARTBEAT: u16 = 1;

#[esp_rtos::main]
async fn main(_spawner: Spawner) {
    // init hardware
    esp_println::logger::init_logger_from_env();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // initial channel values
    let mut store = ChannelStore::new();
    for (bit, on) in [(137, true), (106, true), (152, true), (150, false), (153, true)] {
        store.set_discrete_bit(bit, on).unwrap();
    }

    // initialize module
    info!("setting up module");
    let config = esp_hal::uart::Config::default()
        .with_baudrate(9600)
        .with_data_bits(DataBits::_8)
        .with_stop_bits(StopBits::_1)
        .with_parity(Parity::None)
        .with_rx(RxConfig::default() .with_fifo_full_threshold(1))
        ;
    let bus = esp_hal::uart::Uart::new(peripherals.UART1, config).unwrap()
        .with_rx(peripherals.GPIO16)
        .with_tx(peripherals.GPIO17)
        .into_async();
    let module = Responder::new(bus, Delay, store);
    info!("init done");
    // refresh channels periodically
    let task = async {
        info!("running task");
        let mut value = 0u32;
        loop {
            Timer::after(Duration::from_millis(10)).await;
            value = value.wrapping_add(1);
            let mut store = module.lock().await;
            store.set_analog(RAMP, value).unwrap();
            store.set_discrete_bit(HEARTBEAT, value & 0x100 != 0).unwrap();
        }
    };
    // run application-specific task and module concurrently
    join(task, module.run()).await;
}
