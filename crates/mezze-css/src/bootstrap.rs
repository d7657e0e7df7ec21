//! Deferred stylesheet loading protocol.
//!
//! The full stylesheet is fetched as a non-blocking `media="print"` link the
//! first time any of three signals fires (idle time, a user interaction, or a
//! fallback timer), then switched to `media="all"` on load. The
//! [`DeferredCssLoader`] state machine drives a [`StylesheetHost`], which is
//! the browser in production and a recording fake in tests.
//! [`render_bootstrap_script`] emits the same protocol as an inline script.

use std::time::Duration;

use mezze_core::CssConfig;

/// Opaque handle for a scheduled idle callback or timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub u32);

/// Interaction events that trigger the load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionEvent {
    PointerDown,
    TouchStart,
    KeyDown,
    Scroll,
    Wheel,
}

impl InteractionEvent {
    pub const ALL: [InteractionEvent; 5] = [
        InteractionEvent::PointerDown,
        InteractionEvent::TouchStart,
        InteractionEvent::KeyDown,
        InteractionEvent::Scroll,
        InteractionEvent::Wheel,
    ];

    /// DOM event name.
    pub fn dom_name(&self) -> &'static str {
        match self {
            Self::PointerDown => "pointerdown",
            Self::TouchStart => "touchstart",
            Self::KeyDown => "keydown",
            Self::Scroll => "scroll",
            Self::Wheel => "wheel",
        }
    }
}

/// `media` attribute of the deferred link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Media {
    /// Fetched without blocking render, not applied.
    Print,
    /// Applied.
    All,
}

impl Media {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Print => "print",
            Self::All => "all",
        }
    }
}

/// Why a timer was scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Stand-in for the idle callback.
    Idle,
    /// Unconditional load trigger.
    Fallback,
    /// Forces `media="all"` when the load event never arrives.
    Activation,
}

/// Signal that started the load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadTrigger {
    Idle,
    Interaction(InteractionEvent),
    FallbackTimer,
}

/// Loading state of one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CssLoadState {
    /// Only the inlined critical CSS is applied.
    InlineOnly,
    /// Deferred link attached with `media="print"`.
    Loading,
    /// Deferred link switched to `media="all"`.
    FullCssActive,
}

/// Page environment the loader runs against.
pub trait StylesheetHost {
    /// Whether an idle-callback primitive exists.
    fn supports_idle_callback(&self) -> bool;

    fn request_idle_callback(&mut self, timeout: Duration) -> TaskId;

    fn cancel_idle_callback(&mut self, id: TaskId);

    fn set_timer(&mut self, kind: TimerKind, delay: Duration) -> TaskId;

    fn clear_timer(&mut self, id: TaskId);

    /// Listeners are registered passive.
    fn add_listener(&mut self, event: InteractionEvent);

    fn remove_listener(&mut self, event: InteractionEvent);

    fn attach_stylesheet(&mut self, href: &str, media: Media);

    /// Change the media of the attached deferred link.
    fn set_media(&mut self, media: Media);
}

/// Timing parameters for the load protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    pub href: String,
    pub idle_timeout: Duration,
    pub idle_fallback: Duration,
    pub fallback: Duration,
    pub activation_timeout: Duration,
}

impl From<&CssConfig> for LoaderConfig {
    fn from(config: &CssConfig) -> Self {
        Self {
            href: config.deferred_href.clone(),
            idle_timeout: Duration::from_millis(config.idle_timeout_ms),
            idle_fallback: Duration::from_millis(config.idle_fallback_ms),
            fallback: Duration::from_millis(config.fallback_ms),
            activation_timeout: Duration::from_millis(config.activation_timeout_ms),
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self::from(&CssConfig::default())
    }
}

#[derive(Debug, Clone, Copy)]
enum IdleTask {
    Callback(TaskId),
    Timer(TaskId),
}

/// One-shot deferred stylesheet loader.
pub struct DeferredCssLoader<H> {
    host: H,
    config: LoaderConfig,
    state: CssLoadState,
    loaded: bool,
    listening: bool,
    idle: Option<IdleTask>,
    fallback: Option<TaskId>,
    activation: Option<TaskId>,
}

impl<H: StylesheetHost> DeferredCssLoader<H> {
    pub fn new(host: H, config: LoaderConfig) -> Self {
        Self {
            host,
            config,
            state: CssLoadState::InlineOnly,
            loaded: false,
            listening: false,
            idle: None,
            fallback: None,
            activation: None,
        }
    }

    pub fn state(&self) -> CssLoadState {
        self.state
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    /// Schedule all three triggers. Does nothing once loading has begun.
    pub fn start(&mut self) {
        if self.loaded || self.idle.is_some() {
            return;
        }

        self.idle = Some(if self.host.supports_idle_callback() {
            IdleTask::Callback(self.host.request_idle_callback(self.config.idle_timeout))
        } else {
            IdleTask::Timer(self.host.set_timer(TimerKind::Idle, self.config.idle_fallback))
        });

        for event in InteractionEvent::ALL {
            self.host.add_listener(event);
        }
        self.listening = true;

        self.fallback = Some(self.host.set_timer(TimerKind::Fallback, self.config.fallback));
    }

    /// Handle a trigger. Returns `true` only for the trigger that started the load.
    pub fn on_trigger(&mut self, trigger: LoadTrigger) -> bool {
        if self.loaded {
            return false;
        }
        self.loaded = true;

        // The task that fired is already spent.
        match trigger {
            LoadTrigger::Idle => self.idle = None,
            LoadTrigger::FallbackTimer => self.fallback = None,
            LoadTrigger::Interaction(_) => {}
        }
        self.cancel_pending();

        self.host.attach_stylesheet(&self.config.href, Media::Print);
        self.activation = Some(
            self.host
                .set_timer(TimerKind::Activation, self.config.activation_timeout),
        );
        self.state = CssLoadState::Loading;
        true
    }

    /// The deferred stylesheet finished loading.
    pub fn on_stylesheet_loaded(&mut self) -> bool {
        if let Some(id) = self.activation.take() {
            self.host.clear_timer(id);
        }
        self.activate()
    }

    /// The activation timer fired before the load event.
    pub fn on_activation_timeout(&mut self) -> bool {
        self.activation = None;
        self.activate()
    }

    /// Clear every pending timer and listener, e.g. when the page goes away.
    pub fn teardown(&mut self) {
        self.cancel_pending();
        if let Some(id) = self.activation.take() {
            self.host.clear_timer(id);
        }
    }

    fn activate(&mut self) -> bool {
        if self.state != CssLoadState::Loading {
            return false;
        }
        self.host.set_media(Media::All);
        self.state = CssLoadState::FullCssActive;
        true
    }

    fn cancel_pending(&mut self) {
        if self.listening {
            for event in InteractionEvent::ALL {
                self.host.remove_listener(event);
            }
            self.listening = false;
        }
        match self.idle.take() {
            Some(IdleTask::Callback(id)) => self.host.cancel_idle_callback(id),
            Some(IdleTask::Timer(id)) => self.host.clear_timer(id),
            None => {}
        }
        if let Some(id) = self.fallback.take() {
            self.host.clear_timer(id);
        }
    }
}

const BOOTSTRAP_TEMPLATE: &str = r#"(function(){var href=__HREF__,events=__EVENTS__,opts={passive:true},loaded=false,idleId=null,idleIsTimer=false,fallbackId=null,activationId=null;function cancel(){for(var i=0;i<events.length;i++){document.removeEventListener(events[i],trigger,opts);}if(fallbackId!==null){clearTimeout(fallbackId);fallbackId=null;}if(idleId!==null){if(idleIsTimer){clearTimeout(idleId);}else{window.cancelIdleCallback(idleId);}idleId=null;}if(activationId!==null){clearTimeout(activationId);activationId=null;}}function trigger(){if(loaded){return;}loaded=true;cancel();var link=document.createElement("link");link.rel="stylesheet";link.href=href;link.media="print";activationId=setTimeout(function(){activationId=null;if(link.media==="print"){link.media="all";}},__ACTIVATION__);link.onload=function(){if(activationId!==null){clearTimeout(activationId);activationId=null;}link.media="all";};document.head.appendChild(link);}if("requestIdleCallback" in window){idleId=window.requestIdleCallback(function(){idleId=null;trigger();},{timeout:__IDLE__});}else{idleIsTimer=true;idleId=setTimeout(function(){idleId=null;trigger();},__IDLE_FALLBACK__);}for(var i=0;i<events.length;i++){document.addEventListener(events[i],trigger,opts);}fallbackId=setTimeout(function(){fallbackId=null;trigger();},__FALLBACK__);window.addEventListener("pagehide",cancel,{once:true});})();"#;

/// Inline script implementing the load protocol in the browser.
pub fn render_bootstrap_script(config: &CssConfig) -> String {
    let events: Vec<&str> = InteractionEvent::ALL.iter().map(|e| e.dom_name()).collect();
    BOOTSTRAP_TEMPLATE
        .replace("__HREF__", &js_string(&config.deferred_href))
        .replace("__EVENTS__", &serde_json::Value::from(events).to_string())
        .replace("__ACTIVATION__", &config.activation_timeout_ms.to_string())
        .replace("__IDLE_FALLBACK__", &config.idle_fallback_ms.to_string())
        .replace("__IDLE__", &config.idle_timeout_ms.to_string())
        .replace("__FALLBACK__", &config.fallback_ms.to_string())
}

/// Quote a value as a JS string literal that is also safe inside `<script>`.
pub(crate) fn js_string(value: &str) -> String {
    serde_json::Value::from(value).to_string().replace("</", "<\\/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        RequestIdle(Duration),
        CancelIdle(TaskId),
        SetTimer(TimerKind, Duration),
        ClearTimer(TaskId),
        Add(InteractionEvent),
        Remove(InteractionEvent),
        Attach(String, Media),
        SetMedia(Media),
    }

    #[derive(Default)]
    struct RecordingHost {
        idle_supported: bool,
        next_id: u32,
        calls: Vec<Call>,
    }

    impl RecordingHost {
        fn with_idle() -> Self {
            Self {
                idle_supported: true,
                ..Default::default()
            }
        }

        fn id(&mut self) -> TaskId {
            self.next_id += 1;
            TaskId(self.next_id)
        }

        fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
            self.calls.iter().filter(|c| pred(c)).count()
        }

        fn attaches(&self) -> usize {
            self.count(|c| matches!(c, Call::Attach(..)))
        }
    }

    impl StylesheetHost for RecordingHost {
        fn supports_idle_callback(&self) -> bool {
            self.idle_supported
        }

        fn request_idle_callback(&mut self, timeout: Duration) -> TaskId {
            self.calls.push(Call::RequestIdle(timeout));
            self.id()
        }

        fn cancel_idle_callback(&mut self, id: TaskId) {
            self.calls.push(Call::CancelIdle(id));
        }

        fn set_timer(&mut self, kind: TimerKind, delay: Duration) -> TaskId {
            self.calls.push(Call::SetTimer(kind, delay));
            self.id()
        }

        fn clear_timer(&mut self, id: TaskId) {
            self.calls.push(Call::ClearTimer(id));
        }

        fn add_listener(&mut self, event: InteractionEvent) {
            self.calls.push(Call::Add(event));
        }

        fn remove_listener(&mut self, event: InteractionEvent) {
            self.calls.push(Call::Remove(event));
        }

        fn attach_stylesheet(&mut self, href: &str, media: Media) {
            self.calls.push(Call::Attach(href.to_string(), media));
        }

        fn set_media(&mut self, media: Media) {
            self.calls.push(Call::SetMedia(media));
        }
    }

    fn started(host: RecordingHost) -> DeferredCssLoader<RecordingHost> {
        let mut loader = DeferredCssLoader::new(host, LoaderConfig::default());
        loader.start();
        loader
    }

    // === Scheduling ===

    #[test]
    fn test_start_with_idle_callback() {
        let loader = started(RecordingHost::with_idle());
        let calls = &loader.host().calls;
        assert_eq!(calls[0], Call::RequestIdle(Duration::from_millis(100)));
        assert_eq!(loader.host().count(|c| matches!(c, Call::Add(_))), 5);
        assert_eq!(
            calls.last(),
            Some(&Call::SetTimer(TimerKind::Fallback, Duration::from_millis(1000)))
        );
        assert_eq!(loader.state(), CssLoadState::InlineOnly);
    }

    #[test]
    fn test_start_without_idle_callback_uses_timer() {
        let loader = started(RecordingHost::default());
        assert_eq!(
            loader.host().calls[0],
            Call::SetTimer(TimerKind::Idle, Duration::from_millis(50))
        );
    }

    #[test]
    fn test_start_twice_schedules_once() {
        let mut loader = started(RecordingHost::with_idle());
        let before = loader.host().calls.len();
        loader.start();
        assert_eq!(loader.host().calls.len(), before);
    }

    // === One-shot loading ===

    #[test]
    fn test_each_trigger_alone_loads_once() {
        for trigger in [
            LoadTrigger::Idle,
            LoadTrigger::Interaction(InteractionEvent::KeyDown),
            LoadTrigger::FallbackTimer,
        ] {
            let mut loader = started(RecordingHost::with_idle());
            assert!(loader.on_trigger(trigger));
            assert_eq!(loader.state(), CssLoadState::Loading);
            assert_eq!(loader.host().attaches(), 1);
            assert!(loader.host().calls.contains(&Call::Attach(
                "/css/deferred-styles.css".to_string(),
                Media::Print
            )));
        }
    }

    #[test]
    fn test_all_triggers_load_exactly_once() {
        let mut loader = started(RecordingHost::with_idle());
        assert!(loader.on_trigger(LoadTrigger::Idle));
        assert!(!loader.on_trigger(LoadTrigger::Interaction(InteractionEvent::PointerDown)));
        assert!(!loader.on_trigger(LoadTrigger::FallbackTimer));
        assert_eq!(loader.host().attaches(), 1);
    }

    #[test]
    fn test_trigger_cancels_losing_signals() {
        let mut loader = started(RecordingHost::with_idle());
        // ids: 1 idle, 2 fallback
        loader.on_trigger(LoadTrigger::Interaction(InteractionEvent::Scroll));
        let host = loader.host();
        assert_eq!(host.count(|c| matches!(c, Call::Remove(_))), 5);
        assert!(host.calls.contains(&Call::CancelIdle(TaskId(1))));
        assert!(host.calls.contains(&Call::ClearTimer(TaskId(2))));
    }

    #[test]
    fn test_idle_trigger_does_not_cancel_itself() {
        let mut loader = started(RecordingHost::with_idle());
        loader.on_trigger(LoadTrigger::Idle);
        let host = loader.host();
        assert!(!host.calls.iter().any(|c| matches!(c, Call::CancelIdle(_))));
        assert!(host.calls.contains(&Call::ClearTimer(TaskId(2))));
    }

    #[test]
    fn test_trigger_schedules_activation_timeout() {
        let mut loader = started(RecordingHost::with_idle());
        loader.on_trigger(LoadTrigger::FallbackTimer);
        assert_eq!(
            loader.host().calls.last(),
            Some(&Call::SetTimer(TimerKind::Activation, Duration::from_millis(3000)))
        );
    }

    // === Activation ===

    #[test]
    fn test_load_event_activates() {
        let mut loader = started(RecordingHost::with_idle());
        loader.on_trigger(LoadTrigger::Idle);
        assert!(loader.on_stylesheet_loaded());
        assert_eq!(loader.state(), CssLoadState::FullCssActive);
        assert!(!loader.on_activation_timeout());
        assert_eq!(loader.host().count(|c| *c == Call::SetMedia(Media::All)), 1);
    }

    #[test]
    fn test_activation_timeout_activates() {
        let mut loader = started(RecordingHost::with_idle());
        loader.on_trigger(LoadTrigger::Idle);
        assert!(loader.on_activation_timeout());
        assert!(!loader.on_stylesheet_loaded());
        assert_eq!(loader.state(), CssLoadState::FullCssActive);
        assert_eq!(loader.host().count(|c| *c == Call::SetMedia(Media::All)), 1);
    }

    #[test]
    fn test_activation_before_load_is_ignored() {
        let mut loader = started(RecordingHost::with_idle());
        assert!(!loader.on_stylesheet_loaded());
        assert!(!loader.on_activation_timeout());
        assert_eq!(loader.state(), CssLoadState::InlineOnly);
    }

    // === Teardown ===

    #[test]
    fn test_teardown_before_load() {
        let mut loader = started(RecordingHost::default());
        loader.teardown();
        let host = loader.host();
        assert_eq!(host.count(|c| matches!(c, Call::Remove(_))), 5);
        assert!(host.calls.contains(&Call::ClearTimer(TaskId(1))));
        assert!(host.calls.contains(&Call::ClearTimer(TaskId(2))));
        assert_eq!(host.attaches(), 0);
    }

    #[test]
    fn test_teardown_during_loading_clears_activation() {
        let mut loader = started(RecordingHost::with_idle());
        loader.on_trigger(LoadTrigger::Idle);
        // activation timer is id 3
        loader.teardown();
        assert!(loader.host().calls.contains(&Call::ClearTimer(TaskId(3))));
    }

    // === Script ===

    #[test]
    fn test_bootstrap_script_parameters() {
        let script = render_bootstrap_script(&CssConfig::default());
        assert!(script.contains(r#"href="/css/deferred-styles.css""#));
        assert!(script.contains(
            r#"["pointerdown","touchstart","keydown","scroll","wheel"]"#
        ));
        assert!(script.contains("{timeout:100}"));
        assert!(script.contains("},50);"));
        assert!(script.contains("},1000);"));
        assert!(script.contains("},3000);"));
        assert!(!script.contains("__"));
    }

    #[test]
    fn test_bootstrap_script_pagehide_clears_activation() {
        let script = render_bootstrap_script(&CssConfig::default());
        let cancel_start = script.find("function cancel(){").unwrap();
        let cancel_end = script.find("function trigger(){").unwrap();
        let cancel = &script[cancel_start..cancel_end];
        assert!(cancel.contains("clearTimeout(activationId)"));
        assert!(script.contains("activationId=setTimeout("));
        assert!(script.contains(r#"addEventListener("pagehide",cancel"#));
    }

    #[test]
    fn test_bootstrap_script_escapes_href() {
        let config = CssConfig {
            deferred_href: "/x\"</script>.css".to_string(),
            ..CssConfig::default()
        };
        let script = render_bootstrap_script(&config);
        assert!(!script.contains("</script>"));
        assert!(script.contains(r#"href="/x\"<\/script>.css""#));
    }
}
