/// Convert a `\\wsl$\<distro>\...` UNC path into the POSIX path it addresses
/// inside the distribution, by stripping the server and share components.
pub fn posix_path_from_unc(unc: &str) -> String {
    let mut segments = unc.trim_start_matches('\\').split('\\');
    // server ("wsl$") and share (the distribution name)
    segments.next();
    segments.next();

    let mut posix = String::new();
    for segment in segments {
        posix.push('/');
        posix.push_str(segment);
    }
    if posix.is_empty() {
        posix.push('/');
    }
    posix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posix_path_from_unc() {
        assert_eq!(
            posix_path_from_unc(r"\\wsl$\Ubuntu-20.04\home\test\whatever"),
            "/home/test/whatever"
        );
    }

    #[test]
    fn test_posix_path_from_unc_root() {
        assert_eq!(posix_path_from_unc(r"\\wsl$\alpine-base"), "/");
    }
}
