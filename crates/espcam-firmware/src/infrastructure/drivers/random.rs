use esp_hal::rng::Rng;
use rand_core::RngCore;

pub(crate) fn get_seed() -> u64 {
    let rng = Rng::new();
    u64::from(rng.random()) << 32 | u64::from(rng.random())
}

/// Hardware RNG behind [`RngCore`], used for retry jitter
pub(crate) struct HardwareRng(Rng);

impl HardwareRng {
    pub(crate) fn new() -> Self {
        Self(Rng::new())
    }
}

impl RngCore for HardwareRng {
    fn next_u32(&mut self) -> u32 {
        self.0.random()
    }

    fn next_u64(&mut self) -> u64 {
        rand_core::impls::next_u64_via_u32(self)
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        rand_core::impls::fill_bytes_via_next(self, dst);
    }
}
