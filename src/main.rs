use std::net::TcpListener;
use std::path::Path;
use std::sync::Arc;

use common::{ControllerConfig, Result, SharedState};
use hardware::{Actuator, GpioSolenoids, Mcp4725Dac, ReferenceSensor, SerialLink, SharedLink, SolenoidBank, VeabSensor};

const DEFAULT_CONFIG: &str = "configs/controller.toml";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        log::error!("fatal: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = if Path::new(&config_path).exists() {
        ControllerConfig::from_file(&config_path)?
    } else {
        log::warn!("config {config_path} not found, using defaults");
        ControllerConfig::default()
    };
    log::info!(
        "using I2C buses {:?}, TCP port {}, serial device {}",
        config.i2c_buses,
        config.tcp_port,
        config.serial_device
    );

    // One DAC + sensor board per configured bus.
    let mut actuators: Vec<Box<dyn Actuator>> = Vec::with_capacity(config.actuator_count());
    let mut sensors: Vec<Box<dyn ReferenceSensor>> = Vec::with_capacity(config.actuator_count());
    for &bus in &config.i2c_buses {
        actuators.push(Box::new(Mcp4725Dac::new(bus)?));
        sensors.push(Box::new(VeabSensor::new(bus)?));
    }
    log::info!("{} actuator board(s) initialized", actuators.len());

    let solenoids: Box<dyn SolenoidBank> = Box::new(GpioSolenoids::new()?);
    let link = SharedLink::new(SerialLink::new(&config.serial_device));

    let state = Arc::new(SharedState::new(config.actuator_count()));

    let listener = TcpListener::bind(("0.0.0.0", config.tcp_port))?;
    log::info!("listening on port {}, waiting for control client", config.tcp_port);
    let (client, peer) = listener.accept()?;
    log::info!("control client {peer} connected");

    let registry = runtime::launch(&config, state, client, actuators, sensors, solenoids, link)?;
    registry.join_all();

    log::info!("controller stopped");
    Ok(())
}
