//! AF_PACKET socket implementation

use super::{Capture, RxInfo};
use crate::protocol::MacAddr;
use crate::{Error, Result};
use std::os::unix::io::{AsRawFd, RawFd};
use tokio::io::unix::AsyncFd;

/// AF_PACKET socket wrapper
pub struct AfPacketSocket {
    async_fd: AsyncFd<RawFd>,
    ifname: String,
    ifindex: i32,
}

impl AfPacketSocket {
    /// Create a new AF_PACKET socket bound to the specified interface.
    ///
    /// Fails if the interface does not exist or is not Ethernet. Must be
    /// called from within a Tokio runtime.
    pub fn bind(ifname: &str) -> Result<Self> {
        let fd = unsafe {
            libc::socket(
                libc::AF_PACKET,
                libc::SOCK_RAW,
                (libc::ETH_P_ALL as u16).to_be() as i32,
            )
        };

        if fd < 0 {
            return Err(Error::Io(std::io::Error::last_os_error()));
        }

        let setup = Self::get_ifindex(fd, ifname).and_then(|ifindex| {
            Self::check_ethernet(fd, ifname)?;
            Ok(ifindex)
        });
        let ifindex = match setup {
            Ok(ifindex) => ifindex,
            Err(e) => {
                unsafe { libc::close(fd) };
                return Err(e);
            }
        };

        let sockaddr = libc::sockaddr_ll {
            sll_family: libc::AF_PACKET as u16,
            sll_protocol: (libc::ETH_P_ALL as u16).to_be(),
            sll_ifindex: ifindex,
            sll_hatype: 0,
            sll_pkttype: 0,
            sll_halen: 0,
            sll_addr: [0; 8],
        };

        let ret = unsafe {
            libc::bind(
                fd,
                &sockaddr as *const _ as *const libc::sockaddr,
                std::mem::size_of::<libc::sockaddr_ll>() as u32,
            )
        };

        if ret < 0 {
            let err = std::io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(Error::Io(err));
        }

        // Set non-blocking
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
        unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };

        let async_fd = match AsyncFd::new(fd) {
            Ok(async_fd) => async_fd,
            Err(e) => {
                unsafe { libc::close(fd) };
                return Err(Error::Io(e));
            }
        };

        Ok(Self {
            async_fd,
            ifname: ifname.to_string(),
            ifindex,
        })
    }

    /// Zeroed `ifreq` carrying the interface name
    fn ifreq_for(ifname: &str) -> Result<libc::ifreq> {
        let name = ifname.as_bytes();
        if name.is_empty() || name.len() >= libc::IFNAMSIZ || name.contains(&0) {
            return Err(Error::InterfaceNotFound {
                name: ifname.to_string(),
            });
        }

        let mut ifr: libc::ifreq = unsafe { std::mem::zeroed() };
        for (dst, src) in ifr.ifr_name.iter_mut().zip(name) {
            *dst = *src as libc::c_char;
        }
        Ok(ifr)
    }

    fn get_ifindex(fd: RawFd, ifname: &str) -> Result<i32> {
        let mut ifr = Self::ifreq_for(ifname)?;

        let ret = unsafe { libc::ioctl(fd, libc::SIOCGIFINDEX, &mut ifr) };
        if ret < 0 {
            return Err(Error::InterfaceNotFound {
                name: ifname.to_string(),
            });
        }

        Ok(unsafe { ifr.ifr_ifru.ifru_ifindex })
    }

    fn read_hwaddr(fd: RawFd, ifname: &str) -> Result<libc::sockaddr> {
        let mut ifr = Self::ifreq_for(ifname)?;

        let ret = unsafe { libc::ioctl(fd, libc::SIOCGIFHWADDR, &mut ifr) };
        if ret < 0 {
            return Err(Error::Io(std::io::Error::last_os_error()));
        }

        Ok(unsafe { ifr.ifr_ifru.ifru_hwaddr })
    }

    fn check_ethernet(fd: RawFd, ifname: &str) -> Result<()> {
        let hwaddr = Self::read_hwaddr(fd, ifname)?;
        if hwaddr.sa_family != libc::ARPHRD_ETHER {
            return Err(Error::NotEthernet {
                name: ifname.to_string(),
            });
        }
        Ok(())
    }

    fn get_flags(fd: RawFd, ifname: &str) -> std::io::Result<libc::c_short> {
        let mut ifr = Self::ifreq_for(ifname).map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid interface name")
        })?;

        let ret = unsafe { libc::ioctl(fd, libc::SIOCGIFFLAGS, &mut ifr) };
        if ret < 0 {
            return Err(std::io::Error::last_os_error());
        }

        Ok(unsafe { ifr.ifr_ifru.ifru_flags })
    }

    fn set_flags(fd: RawFd, ifname: &str, flags: libc::c_short) -> std::io::Result<()> {
        let mut ifr = Self::ifreq_for(ifname).map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid interface name")
        })?;
        ifr.ifr_ifru.ifru_flags = flags;

        let ret = unsafe { libc::ioctl(fd, libc::SIOCSIFFLAGS, &mut ifr) };
        if ret < 0 {
            return Err(std::io::Error::last_os_error());
        }

        Ok(())
    }

    /// Receive a frame (async), reporting the interface it arrived on
    pub async fn recv(&mut self, buf: &mut [u8]) -> Result<RxInfo> {
        loop {
            let mut guard = self.async_fd.readable_mut().await.map_err(Error::Io)?;

            match guard.try_io(|inner| {
                let fd = *inner.get_ref();
                let mut addr: libc::sockaddr_ll = unsafe { std::mem::zeroed() };
                let mut addr_len = std::mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t;
                let n = unsafe {
                    libc::recvfrom(
                        fd,
                        buf.as_mut_ptr() as *mut _,
                        buf.len(),
                        0,
                        &mut addr as *mut _ as *mut libc::sockaddr,
                        &mut addr_len,
                    )
                };
                if n < 0 {
                    Err(std::io::Error::last_os_error())
                } else {
                    Ok(RxInfo {
                        len: n as usize,
                        ifindex: addr.sll_ifindex,
                    })
                }
            }) {
                Ok(Ok(info)) => return Ok(info),
                Ok(Err(e)) => return Err(Error::Io(e)),
                Err(_would_block) => continue,
            }
        }
    }

    /// Send a frame (async)
    pub async fn send(&mut self, buf: &[u8]) -> Result<usize> {
        loop {
            let mut guard = self.async_fd.writable_mut().await.map_err(Error::Io)?;

            match guard.try_io(|inner| {
                let fd = *inner.get_ref();
                let n = unsafe { libc::send(fd, buf.as_ptr() as *const _, buf.len(), 0) };
                if n < 0 {
                    Err(std::io::Error::last_os_error())
                } else {
                    Ok(n as usize)
                }
            }) {
                Ok(Ok(len)) => return Ok(len),
                Ok(Err(e)) => return Err(Error::Io(e)),
                Err(_would_block) => continue,
            }
        }
    }

    pub fn ifindex(&self) -> i32 {
        self.ifindex
    }

    pub fn ifname(&self) -> &str {
        &self.ifname
    }
}

impl AsRawFd for AfPacketSocket {
    fn as_raw_fd(&self) -> RawFd {
        *self.async_fd.get_ref()
    }
}

impl Drop for AfPacketSocket {
    fn drop(&mut self) {
        unsafe { libc::close(*self.async_fd.get_ref()) };
    }
}

impl Capture for AfPacketSocket {
    async fn recv(&mut self, buf: &mut [u8]) -> Result<RxInfo> {
        AfPacketSocket::recv(self, buf).await
    }

    async fn send(&mut self, buf: &[u8]) -> Result<usize> {
        AfPacketSocket::send(self, buf).await
    }

    fn ifindex(&self) -> i32 {
        self.ifindex
    }

    fn hardware_addr(&self) -> Result<MacAddr> {
        let hwaddr = Self::read_hwaddr(self.as_raw_fd(), &self.ifname)?;
        let mut mac = [0u8; 6];
        for (dst, src) in mac.iter_mut().zip(hwaddr.sa_data.iter()) {
            *dst = *src as u8;
        }
        Ok(MacAddr(mac))
    }

    fn is_promiscuous(&self) -> Result<bool> {
        let flags = Self::get_flags(self.as_raw_fd(), &self.ifname).map_err(|source| {
            Error::Promiscuous {
                name: self.ifname.clone(),
                source,
            }
        })?;
        Ok(flags as libc::c_int & libc::IFF_PROMISC != 0)
    }

    fn set_promiscuous(&mut self, enable: bool) -> Result<()> {
        let fd = self.as_raw_fd();
        let promisc_err = |source| Error::Promiscuous {
            name: self.ifname.clone(),
            source,
        };

        let flags = Self::get_flags(fd, &self.ifname).map_err(promisc_err)?;
        let flags = if enable {
            flags | libc::IFF_PROMISC as libc::c_short
        } else {
            flags & !(libc::IFF_PROMISC as libc::c_short)
        };
        Self::set_flags(fd, &self.ifname, flags).map_err(promisc_err)
    }
}
