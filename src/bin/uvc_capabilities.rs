use clap::App;
use clap::Arg;
use clap::ArgMatches;

use uvc_capabilities::registry::registry_from_str;
use uvc_capabilities::CapabilitySet;
use uvc_capabilities::Context;
use uvc_capabilities::ImplementedRegistry;
use uvc_capabilities::Result;
use uvc_capabilities::VideoControlDescriptors;

fn main() {
  env_logger::init();

  let matches = App::new("uvc-capabilities")
    .version(env!("CARGO_PKG_VERSION"))
    .about("Lists the UVC controls a camera supports")
    .arg(
      Arg::with_name("all")
        .short("a")
        .long("all")
        .help("Include declared controls that have no implementation"),
    )
    .arg(
      Arg::with_name("device")
        .short("d")
        .long("device")
        .value_name("VID:PID")
        .help("Camera to inspect (default: first camera found)")
        .takes_value(true),
    )
    .arg(
      Arg::with_name("file")
        .short("f")
        .long("file")
        .value_name("PATH")
        .help("Decode a raw Video Control descriptor dump instead of a device")
        .takes_value(true)
        .conflicts_with("device"),
    )
    .arg(
      Arg::with_name("registry")
        .short("r")
        .long("registry")
        .value_name("PATH")
        .help("File listing implemented controls, one per line")
        .takes_value(true),
    )
    .arg(
      Arg::with_name("report")
        .long("report")
        .help("Print the parsed descriptors instead of control names"),
    )
    .arg(
      Arg::with_name("json")
        .long("json")
        .help("Print JSON"),
    )
    .arg(
      Arg::with_name("list")
        .short("l")
        .long("list")
        .help("List attached cameras and exit")
        .conflicts_with_all(&["file", "device"]),
    )
    .get_matches();

  if let Err(err) = run(&matches) {
    eprintln!("error: {}", err);
    std::process::exit(1);
  }
}

fn run(matches: &ArgMatches) -> Result<()> {
  let json = matches.is_present("json");

  if matches.is_present("list") {
    return list_cameras(json);
  }

  let extra = match matches.value_of("file") {
    Some(path) => std::fs::read(path)?,
    None => {
      let context = Context::new()?;
      let camera = match matches.value_of("device") {
        Some(id) => {
          let (vendor_id, product_id) = uvc_capabilities::parse_device_id(id)?;
          context.find(vendor_id, product_id)?
        }
        None => context
          .cameras()?
          .into_iter()
          .next()
          .ok_or(uvc_capabilities::Error::DeviceNotFound)?,
      };
      camera.extra().to_vec()
    }
  };

  if matches.is_present("report") {
    let report = VideoControlDescriptors::parse(&extra)?;
    if json {
      print_json(&report)?;
    } else {
      print_report(&report);
    }
    return Ok(());
  }

  let registry: Box<dyn ImplementedRegistry> =
    match matches.value_of("registry") {
      Some(path) => {
        let text = std::fs::read_to_string(path)?;
        Box::new(registry_from_str(&text)?)
      }
      None => Box::new(uvc_capabilities::builtin_registry()),
    };

  let capabilities = uvc_capabilities::resolve(
    &extra,
    registry.as_ref(),
    matches.is_present("all"),
  )?;
  print_capabilities(&capabilities, json)
}

fn list_cameras(json: bool) -> Result<()> {
  let cameras = Context::new()?.cameras()?;
  if json {
    return print_json(&cameras);
  }

  for camera in cameras {
    println!(
      "{:04x}:{:04x} {:03}/{:03} {}",
      camera.vendor_id,
      camera.product_id,
      camera.bus_number,
      camera.address,
      camera.product_name.as_deref().unwrap_or("")
    );
  }
  Ok(())
}

fn print_capabilities(capabilities: &CapabilitySet, json: bool) -> Result<()> {
  if json {
    return print_json(capabilities);
  }

  for name in capabilities.iter() {
    println!("{}", name);
  }
  Ok(())
}

fn print_report(report: &VideoControlDescriptors) {
  match &report.camera_terminal {
    Some(terminal) => {
      println!(
        "camera terminal {}: bmControls {:02x?}",
        terminal.terminal_id, terminal.controls
      );
      for name in terminal.capabilities() {
        println!("  {}", name);
      }
    }
    None => println!("camera terminal: none"),
  }

  match &report.processing_unit {
    Some(unit) => {
      println!(
        "processing unit {}: bmControls {:02x?}",
        unit.unit_id, unit.controls
      );
      for name in unit.capabilities() {
        println!("  {}", name);
      }
    }
    None => println!("processing unit: none"),
  }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
  let out =
    serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
  println!("{}", out);
  Ok(())
}
