//! Core-pinned task spawning.
//!
//! ESP-IDF implements `std::thread` on pthreads, which are thin wrappers
//! around FreeRTOS tasks. `esp_pthread_set_cfg()` sets thread-local
//! configuration for the *next* `pthread_create()` from the calling
//! thread, so the config→spawn pair must not be interleaved with other
//! thread creation on the same thread. On host targets this is a plain
//! named thread.

/// CPU core identifiers for the dual-core ESP32.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 0 (PRO_CPU): Wi-Fi, lwIP, MQTT.
    Pro = 0,
    /// Core 1 (APP_CPU): measurement.
    App = 1,
}

/// Spawn a task pinned to `core` with the given FreeRTOS priority and
/// stack. `name` must be NUL-terminated (e.g. `"batcher\0"`).
#[cfg(target_os = "espidf")]
pub fn spawn_on_core(
    core: Core,
    priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: impl FnOnce() + Send + 'static,
) -> std::thread::JoinHandle<()> {
    use esp_idf_svc::sys::{esp_create_default_pthread_config, esp_pthread_set_cfg, ESP_OK};

    // SAFETY: `cfg` is fully initialised by the IDF helper and `name`
    // is a 'static NUL-terminated string that outlives the task.
    unsafe {
        let mut cfg = esp_create_default_pthread_config();
        cfg.pin_to_core = core as i32;
        cfg.prio = priority as i32;
        cfg.stack_size = (stack_kb * 1024) as _;
        cfg.thread_name = name.as_ptr() as *const _;
        let ret = esp_pthread_set_cfg(&cfg);
        assert!(ret == ESP_OK as i32, "esp_pthread_set_cfg failed: {ret}");
    }

    let display_name = name.trim_end_matches('\0');
    log::info!(
        "task: '{}' on {:?} (pri={}, stack={}KB)",
        display_name,
        core,
        priority,
        stack_kb
    );

    std::thread::Builder::new()
        .name(display_name.into())
        .spawn(f)
        .expect("spawn_on_core: thread creation failed")
}

/// Host fallback: ignores core affinity and priority.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_on_core(
    _core: Core,
    _priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: impl FnOnce() + Send + 'static,
) -> std::thread::JoinHandle<()> {
    let display_name = name.trim_end_matches('\0');
    log::debug!("task(sim): '{}' (stack={}KB)", display_name, stack_kb);

    std::thread::Builder::new()
        .name(display_name.into())
        .stack_size(stack_kb.max(64) * 1024)
        .spawn(f)
        .expect("spawn_on_core(sim): thread creation failed")
}
