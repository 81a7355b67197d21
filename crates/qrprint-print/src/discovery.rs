// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// mDNS service discovery for IPP and IPPS printers on the local network.
//
// We browse for `_ipp._tcp.local.` (plain IPP, port 631) and
// `_ipps._tcp.local.` (TLS-secured IPP) using the `mdns-sd` crate for a fixed
// window, then return what resolved. This is the enumeration path for hosts
// without a CUPS scheduler.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use mdns_sd::{Receiver, ServiceDaemon, ServiceEvent, ServiceInfo};
use tracing::{debug, info, warn};

use qrprint_core::error::{QrPrintError, Result};
use qrprint_core::types::PrinterTarget;

/// mDNS service type for plain IPP.
const IPP_SERVICE: &str = "_ipp._tcp.local.";

/// mDNS service type for TLS-secured IPP.
const IPPS_SERVICE: &str = "_ipps._tcp.local.";

/// How long each receiver is polled before switching to the other.
const POLL_SLICE: Duration = Duration::from_millis(100);

/// Browse the network for `window`, then return every printer that resolved.
///
/// Blocking: call from `spawn_blocking` in async code. Results are ordered by
/// mDNS full name so that repeated browses of a stable network agree on which
/// printer comes first.
pub fn browse(window: Duration) -> Result<Vec<PrinterTarget>> {
    let daemon = ServiceDaemon::new()
        .map_err(|e| QrPrintError::NoPrinterAvailable(format!("failed to start mDNS daemon: {e}")))?;

    let ipp_receiver = daemon
        .browse(IPP_SERVICE)
        .map_err(|e| QrPrintError::NoPrinterAvailable(format!("browse {IPP_SERVICE}: {e}")))?;
    let ipps_receiver = daemon
        .browse(IPPS_SERVICE)
        .map_err(|e| QrPrintError::NoPrinterAvailable(format!("browse {IPPS_SERVICE}: {e}")))?;

    info!(window_ms = window.as_millis() as u64, "mDNS printer browse started");

    let mut printers: BTreeMap<String, PrinterTarget> = BTreeMap::new();
    let deadline = Instant::now() + window;
    while Instant::now() < deadline {
        drain(&ipp_receiver, IPP_SERVICE, false, &mut printers);
        drain(&ipps_receiver, IPPS_SERVICE, true, &mut printers);
    }

    for service in [IPP_SERVICE, IPPS_SERVICE] {
        if let Err(e) = daemon.stop_browse(service) {
            debug!(service, error = %e, "stop browse failed");
        }
    }
    if let Err(e) = daemon.shutdown() {
        warn!(error = %e, "mDNS daemon shutdown failed");
    }

    info!(count = printers.len(), "mDNS printer browse finished");
    Ok(printers.into_values().collect())
}

/// Handle events from one receiver for at most one poll slice.
fn drain(
    receiver: &Receiver<ServiceEvent>,
    service_type: &str,
    tls: bool,
    printers: &mut BTreeMap<String, PrinterTarget>,
) {
    let Ok(event) = receiver.recv_timeout(POLL_SLICE) else {
        return;
    };
    match event {
        ServiceEvent::ServiceResolved(info) => {
            let fullname = info.get_fullname().to_owned();
            match service_info_to_target(&info, service_type, tls) {
                Ok(target) => {
                    info!(name = %target.identifier, uri = %target.uri, "printer resolved");
                    printers.insert(fullname, target);
                }
                Err(e) => {
                    warn!(fullname = %fullname, error = %e, "failed to convert resolved service");
                }
            }
        }
        ServiceEvent::ServiceRemoved(_, fullname) => {
            debug!(name = %fullname, "printer removed");
            printers.remove(&fullname);
        }
        other => debug!(event = ?other, "mDNS event"),
    }
}

/// Convert a resolved `ServiceInfo` into a `PrinterTarget`.
///
/// The resource path comes from the TXT `rp` key (e.g. "ipp/print"), falling
/// back to "ipp/print" as IPP Everywhere recommends.
fn service_info_to_target(info: &ServiceInfo, service_type: &str, tls: bool) -> Result<PrinterTarget> {
    let fullname = info.get_fullname();

    // Prefer IPv4 for wider printer compatibility.
    let ip: IpAddr = info
        .get_addresses()
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| info.get_addresses().iter().next())
        .copied()
        .ok_or_else(|| QrPrintError::NoPrinterAvailable(format!("no address for service {fullname}")))?;

    let resource_path = info.get_property_val_str("rp").unwrap_or("ipp/print");
    let scheme = if tls { "ipps" } else { "ipp" };

    Ok(PrinterTarget {
        identifier: instance_name(fullname, service_type).to_owned(),
        uri: printer_uri(scheme, ip, info.get_port(), resource_path),
    })
}

/// Strip the service type suffix from an mDNS full name.
fn instance_name<'a>(fullname: &'a str, service_type: &str) -> &'a str {
    fullname
        .strip_suffix(service_type)
        .map(|s| s.trim_end_matches('.'))
        .filter(|s| !s.is_empty())
        .unwrap_or(fullname)
}

/// Build a printer URI, bracketing IPv6 literals.
fn printer_uri(scheme: &str, ip: IpAddr, port: u16, resource_path: &str) -> String {
    let host = match ip {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => format!("[{v6}]"),
    };
    let path = resource_path.trim_start_matches('/');
    format!("{scheme}://{host}:{port}/{path}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn instance_name_drops_service_suffix() {
        assert_eq!(
            instance_name("Office Laser._ipp._tcp.local.", IPP_SERVICE),
            "Office Laser"
        );
        assert_eq!(instance_name("odd-name", IPP_SERVICE), "odd-name");
    }

    #[test]
    fn uri_for_ipv4_and_ipv6() {
        assert_eq!(
            printer_uri("ipp", IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)), 631, "ipp/print"),
            "ipp://192.168.1.20:631/ipp/print"
        );
        assert_eq!(
            printer_uri("ipps", IpAddr::V6(Ipv6Addr::LOCALHOST), 443, "/printers/lab"),
            "ipps://[::1]:443/printers/lab"
        );
    }
}
