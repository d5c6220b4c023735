mod commands;
mod paths;
mod wsl;

pub use commands::HideWindow;
pub use paths::posix_path_from_unc;
pub use wsl::{
    DistroRecord, WSL_EXE, WslError, decode_utf16le, distro_command_output, import_distro, launch,
    list_distros, open_windows_terminal, parse_distro_list, run_distro_command, shell_invocation,
    spawn_distro_command, terminate, unregister, wsl_available,
};
