/// Connection status codes reported by `AT+CIPSTATUS`
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModuleStatus {
    /// Associated to an access point and an IP was obtained
    Associated,
    /// A TCP connection is established
    TcpConnected,
    /// The TCP connection was closed
    TcpDisconnected,
    /// Not associated to any access point
    Idle,
}

impl ModuleStatus {
    /// Token matched against the status response
    pub fn token(&self) -> &'static str {
        match self {
            ModuleStatus::Associated => "STATUS:2",
            ModuleStatus::TcpConnected => "STATUS:3",
            ModuleStatus::TcpDisconnected => "STATUS:4",
            ModuleStatus::Idle => "STATUS:5",
        }
    }
}

/// Single line response of CIFSR command, e.g. `+CIFSR:STAIP,"10.0.0.181"`
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LocalAddressResponse<'a> {
    /// Address type
    /// * STAIP: Local IPv4 address
    /// * STAIP6LL: Link local IPv6 address
    /// * STAIP6GL: Global IPv6 address
    /// * STAMAC: Local MAC address
    pub address_type: &'a str,

    /// String encoded address
    pub address: &'a str,
}

impl<'a> LocalAddressResponse<'a> {
    /// Parses a single response line. Returns None for any other line, e.g. the command echo.
    pub fn parse(line: &'a str) -> Option<Self> {
        let (address_type, address) = line.trim().strip_prefix("+CIFSR:")?.split_once(',')?;
        let address = address.trim_matches('"');

        Some(Self { address_type, address })
    }

    /// Iterates over all address lines of the given response
    pub fn parse_all(response: &'a str) -> impl Iterator<Item = LocalAddressResponse<'a>> {
        response.lines().filter_map(LocalAddressResponse::parse)
    }
}
