use trackwire_proto::Dialect;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("trackwire {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: trackwire");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("TRACKWIRE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    let dialects: Vec<&str> = Dialect::ALL.iter().map(|d| d.as_str()).collect();
    println!("dialects: {}", dialects.join(", "));
    println!(
        "features: session={}, serial={}, cli=true",
        cfg!(feature = "session"),
        cfg!(unix)
    );

    Ok(SUCCESS)
}
