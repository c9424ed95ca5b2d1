use clap::Parser;
use virt_inventory::{DEFAULT_ANSIBLE_USER, DEFAULT_URI};

/// Ansible calls inventory scripts with either `--list` or `--host NAME`.
#[derive(Parser, Debug)]
#[command(name = "libvirt-inventory")]
#[command(about = "Ansible dynamic inventory of running libvirt domains.")]
pub struct CommandLine {
    /// Print every group (the default)
    ///
    /// Listing is what happens without `--host`; the flag is accepted
    /// because Ansible always passes it.
    #[arg(long, conflicts_with = "host")]
    pub list: bool,

    /// Print the variables of one host; always empty, vars live on the groups
    #[arg(long, value_name = "NAME")]
    pub host: Option<String>,

    /// libvirt connection URI
    #[arg(long, default_value = DEFAULT_URI)]
    pub uri: String,

    /// ansible_user set on every group
    #[arg(long, default_value = DEFAULT_ANSIBLE_USER)]
    pub user: String,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cmd = CommandLine::try_parse_from(["libvirt-inventory"]).unwrap();
        assert!(!cmd.list);
        assert!(cmd.host.is_none());
        assert_eq!(cmd.uri, "qemu:///system");
        assert_eq!(cmd.user, "evgnomon");
    }

    #[test]
    fn test_ansible_host_call() {
        let cmd =
            CommandLine::try_parse_from(["libvirt-inventory", "--host", "10.0.0.5"]).unwrap();
        assert_eq!(cmd.host.as_deref(), Some("10.0.0.5"));
    }

    #[test]
    fn test_list_and_host_conflict() {
        let args = ["libvirt-inventory", "--list", "--host", "x"];
        assert!(CommandLine::try_parse_from(args).is_err());
    }
}
