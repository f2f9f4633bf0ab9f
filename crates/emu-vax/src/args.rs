use clap::Parser;
use cpu_vax::VaxConfig;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "emu-vax", about = "Run a raw VAX memory image until HALT")]
pub struct Args {
    /// Raw image to load into memory
    pub image: PathBuf,

    /// Address the image is loaded at (hex: 0x1234 or decimal: 1234)
    #[arg(long, value_parser = parse_hex_or_dec, default_value = "0x1000")]
    pub load_addr: u32,

    /// Initial PC. Defaults to the load address.
    #[arg(long, value_parser = parse_hex_or_dec)]
    pub entry: Option<u32>,

    /// Initial kernel stack pointer
    #[arg(long, value_parser = parse_hex_or_dec)]
    pub sp: Option<u32>,

    /// System Control Block base
    #[arg(long, value_parser = parse_hex_or_dec)]
    pub scbb: Option<u32>,

    /// Memory size in bytes
    #[arg(long, value_parser = parse_hex_or_dec)]
    pub memory: Option<u32>,

    /// Stop after this many steps (instructions plus exception deliveries)
    #[arg(long, short = 'i', default_value_t = 1_000_000)]
    pub max_instructions: u64,
}

impl Args {
    pub fn to_config(&self) -> VaxConfig {
        let defaults = VaxConfig::default();
        VaxConfig {
            reset_pc: self.entry.unwrap_or(self.load_addr),
            reset_sp: self.sp.unwrap_or(defaults.reset_sp),
            scbb: self.scbb.unwrap_or(defaults.scbb),
            memory_size: self
                .memory
                .map_or(defaults.memory_size, |bytes| bytes as usize),
        }
    }

    /// Check that the image fits where it is being loaded.
    pub fn validate(&self, image_len: usize, config: &VaxConfig) -> Result<(), String> {
        let end = self.load_addr as usize + image_len;
        if end > config.memory_size {
            return Err(format!(
                "image of {image_len} bytes at {:#010X} does not fit in {} bytes of memory",
                self.load_addr, config.memory_size
            ));
        }
        Ok(())
    }
}

pub fn parse_hex_or_dec(s: &str) -> Result<u32, std::num::ParseIntError> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(&hex.replace('_', ""), 16)
    } else {
        s.replace('_', "").parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_or_dec() {
        assert_eq!(parse_hex_or_dec("0x1000"), Ok(0x1000));
        assert_eq!(parse_hex_or_dec("0XFF"), Ok(0xFF));
        assert_eq!(parse_hex_or_dec("4096"), Ok(4096));
        assert_eq!(parse_hex_or_dec("0x0010_0000"), Ok(0x10_0000));
        assert!(parse_hex_or_dec("0xZZ").is_err());
    }

    #[test]
    fn test_entry_defaults_to_load_address() {
        let args = Args::parse_from(["emu-vax", "boot.img", "--load-addr", "0x200"]);
        let config = args.to_config();
        assert_eq!(config.reset_pc, 0x200);
        assert_eq!(config.reset_sp, VaxConfig::default().reset_sp);

        let args = Args::parse_from(["emu-vax", "boot.img", "--entry", "0x400", "--memory", "65536"]);
        let config = args.to_config();
        assert_eq!(config.reset_pc, 0x400);
        assert_eq!(config.memory_size, 65536);
    }

    #[test]
    fn test_image_must_fit() {
        let args = Args::parse_from(["emu-vax", "boot.img", "--memory", "0x2000"]);
        let config = args.to_config();
        assert!(args.validate(0x1000, &config).is_ok());
        assert!(args.validate(0x1001, &config).is_err());
    }
}
