/// Abstracts the byte-level bus driver.
///
/// Implementors open a connection to one slave on one bus and move raw bytes
/// over it. They do no locking of their own: every call made by a
/// [`BusHandle`](crate::BusHandle) is already serialized by the bus lock
/// (except in [`Mode::CooperatingGroup`](crate::Mode::CooperatingGroup)).
pub trait Transport: Sync {
    /// Open connection bound to one slave address.
    type Handle: Send;
    /// Error type for transport failures.
    type Error: core::fmt::Debug;

    /// Open bus `bus` and bind the connection to `address`.
    fn open(&self, bus: usize, address: u16)
        -> Result<Self::Handle, Self::Error>;

    /// Release a connection returned by [`open`](Self::open).
    fn close(&self, handle: Self::Handle) -> Result<(), Self::Error>;

    /// Write `buf` to the slave, returning the number of bytes written.
    fn write(
        &self,
        handle: &mut Self::Handle,
        buf: &[u8],
    ) -> Result<usize, Self::Error>;

    /// Read from the slave into `buf`, returning the number of bytes read.
    fn read(
        &self,
        handle: &mut Self::Handle,
        buf: &mut [u8],
    ) -> Result<usize, Self::Error>;
}
