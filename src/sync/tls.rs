/*!
 * Thread-Local-Storage Key Registry
 *
 * Fixed-capacity table mapping keys to per-thread storage slots,
 * process lifetime, never torn down. Key creation linearly scans the
 * table for a free slot; get/set are constant-time indexed access into
 * storage that lives with each thread, separate from the table itself.
 *
 * Destructors are registered and remembered but never invoked on
 * thread exit. That mirrors the interface being modeled; running them
 * would be a deliberate behavioral deviation, not a bug fix.
 */

use crate::core::errors::SyncError;
use crate::core::limits::TLS_KEYS_MAX;
use crate::core::types::SyncResult;
use parking_lot::Mutex;
use std::cell::RefCell;
use std::ptr;
use tracing::trace;

/// Destructor signature recorded per key (never called automatically)
pub type TlsDestructor = fn(*mut ());

/// Opaque handle into the key table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlsKey(usize);

impl TlsKey {
    /// Slot index backing this key
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One table slot: free, or occupied with an optional destructor.
/// The explicit Occupied-without-destructor state plays the role the
/// reference gives to a sentinel pointer.
#[derive(Debug, Clone, Copy)]
enum KeySlot {
    Free,
    Occupied { destructor: Option<TlsDestructor> },
}

/// The process-wide key table, guarded by its own lock
static KEY_TABLE: Mutex<[KeySlot; TLS_KEYS_MAX]> = Mutex::new([KeySlot::Free; TLS_KEYS_MAX]);

thread_local! {
    /// Per-thread value slots, indexed by key
    static VALUES: RefCell<[*mut (); TLS_KEYS_MAX]> = const { RefCell::new([ptr::null_mut(); TLS_KEYS_MAX]) };
}

/// Allocate a key, optionally recording a destructor
///
/// Scans the table for a free slot; `SyncError::KeyTableFull` when all
/// slots are taken.
pub fn create_key(destructor: Option<TlsDestructor>) -> SyncResult<TlsKey> {
    let mut slots = KEY_TABLE.lock();
    for (index, slot) in slots.iter_mut().enumerate() {
        if matches!(slot, KeySlot::Free) {
            *slot = KeySlot::Occupied { destructor };
            trace!(key = index, "TLS key created");
            return Ok(TlsKey(index));
        }
    }
    Err(SyncError::KeyTableFull)
}

/// Return a key's slot to the table
///
/// Per-thread values stored under the key are not cleared; a key
/// created later into the same slot starts from whatever each thread
/// left there, exactly as the reference behaves.
pub fn delete_key(key: TlsKey) -> SyncResult<()> {
    let mut slots = KEY_TABLE.lock();
    let slot = slots
        .get_mut(key.0)
        .ok_or_else(|| SyncError::InvalidArgument(format!("TLS key {} out of range", key.0)))?;
    if matches!(slot, KeySlot::Free) {
        return Err(SyncError::InvalidArgument(format!(
            "TLS key {} is not allocated",
            key.0
        )));
    }
    *slot = KeySlot::Free;
    trace!(key = key.0, "TLS key deleted");
    Ok(())
}

/// Store a value in the calling thread's slot for `key`
pub fn set(key: TlsKey, value: *mut ()) -> SyncResult<()> {
    {
        let slots = KEY_TABLE.lock();
        match slots.get(key.0) {
            Some(KeySlot::Occupied { .. }) => {}
            _ => {
                return Err(SyncError::InvalidArgument(format!(
                    "TLS key {} is not allocated",
                    key.0
                )))
            }
        }
    }
    VALUES.with(|values| values.borrow_mut()[key.0] = value);
    Ok(())
}

/// Read the calling thread's slot for `key`
///
/// Null if nothing was stored on this thread or the key is invalid.
pub fn get(key: TlsKey) -> *mut () {
    if key.0 >= TLS_KEYS_MAX {
        return ptr::null_mut();
    }
    VALUES.with(|values| values.borrow()[key.0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::thread;

    #[test]
    #[serial]
    fn test_create_set_get() {
        let key = create_key(None).unwrap();

        assert!(get(key).is_null());
        let mut value = 42u32;
        set(key, &mut value as *mut u32 as *mut ()).unwrap();
        assert_eq!(get(key), &mut value as *mut u32 as *mut ());

        delete_key(key).unwrap();
    }

    #[test]
    #[serial]
    fn test_values_are_per_thread() {
        let key = create_key(None).unwrap();

        let mut value = 7u32;
        set(key, &mut value as *mut u32 as *mut ()).unwrap();

        // A fresh thread starts with an empty slot
        let handle = thread::spawn(move || get(key).is_null());
        assert!(handle.join().unwrap());

        // Ours is untouched
        assert!(!get(key).is_null());
        delete_key(key).unwrap();
    }

    #[test]
    #[serial]
    fn test_table_exhaustion() {
        let mut keys = Vec::new();
        loop {
            match create_key(None) {
                Ok(key) => keys.push(key),
                Err(err) => {
                    assert_eq!(err, SyncError::KeyTableFull);
                    break;
                }
            }
        }
        assert!(!keys.is_empty());

        for key in keys {
            delete_key(key).unwrap();
        }
    }

    #[test]
    #[serial]
    fn test_destructor_registered_but_inert() {
        fn boom(_value: *mut ()) {
            panic!("destructors must never run");
        }

        let key = create_key(Some(boom)).unwrap();
        let handle = thread::spawn(move || {
            let mut value = 1u8;
            set(key, &mut value as *mut u8 as *mut ()).unwrap();
            // Thread exit must not invoke the destructor
        });
        handle.join().unwrap();
        delete_key(key).unwrap();
    }

    #[test]
    #[serial]
    fn test_invalid_key_operations() {
        let bogus = TlsKey(TLS_KEYS_MAX + 1);
        assert!(get(bogus).is_null());
        assert!(matches!(
            set(bogus, ptr::null_mut()),
            Err(SyncError::InvalidArgument(_))
        ));
        assert!(matches!(
            delete_key(bogus),
            Err(SyncError::InvalidArgument(_))
        ));
    }
}
