//! User-Friendly Error Formatting
//!
//! Turns fatal startup errors into a readable report with troubleshooting
//! hints.

use std::fmt::Write;

/// Format error for user consumption
pub fn format_user_error(error: &anyhow::Error) -> String {
    let mut output = String::new();

    writeln!(&mut output).ok();
    writeln!(&mut output, "ClipSync could not start").ok();
    writeln!(&mut output, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━").ok();
    writeln!(&mut output).ok();

    let error_msg = format!("{:#}", error);

    if error_msg.contains("bind") || error_msg.contains("Address") {
        format_network_error(&mut output);
    } else if error_msg.contains("config") {
        format_config_error(&mut output);
    } else {
        writeln!(&mut output, "An unexpected error occurred.").ok();
    }

    writeln!(&mut output).ok();
    writeln!(&mut output, "Technical details:").ok();
    writeln!(&mut output, "  {}", error_msg).ok();
    writeln!(&mut output).ok();
    writeln!(&mut output, "Run with -vv for detailed logs.").ok();

    output
}

fn format_network_error(output: &mut String) {
    writeln!(output, "Could not open the listening socket.").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Port already in use").ok();
    writeln!(output, "     → Check: ss -tlnp | grep 8765").ok();
    writeln!(output, "     → Or pick another: CLIPSYNC_PORT=8766").ok();
    writeln!(output, "  2. Permission denied (port < 1024)").ok();
    writeln!(output, "     → Use a port >= 1024").ok();
    writeln!(output, "  3. Host is not an address of this machine").ok();
    writeln!(output, "     → Use 0.0.0.0 or 127.0.0.1 for CLIPSYNC_HOST").ok();
}

fn format_config_error(output: &mut String) {
    writeln!(output, "The configuration is invalid.").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Invalid TOML syntax or unknown values").ok();
    writeln!(output, "     → Check the file passed with --config").ok();
    writeln!(output, "  2. Invalid host/port combination").ok();
    writeln!(output, "     → Host must be an IP address, e.g. 0.0.0.0").ok();
}
