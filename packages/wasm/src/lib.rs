//! JavaScript surface of the document core. Everything crosses the
//! boundary as JSON strings.

use doenet_core::{
    render_tree, snapshot, ActionQueue, CoreConfig, CoreObserver, CoreOptions, DoenetCore,
    PersistedState, VariantRequest,
};
use serde::Deserialize;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Options accepted by the constructor
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct OptionsJson {
    config: CoreConfig,
    variant_index: Option<i64>,
    variant_name: Option<String>,
    state: Option<PersistedState>,
}

impl OptionsJson {
    fn parse(json: Option<&str>) -> Result<CoreOptions, String> {
        let raw: OptionsJson = match json.map(str::trim).filter(|s| !s.is_empty()) {
            Some(json) => serde_json::from_str(json).map_err(|e| format!("Invalid options: {e}"))?,
            None => OptionsJson::default(),
        };
        let variant = match (raw.variant_index, raw.variant_name) {
            (Some(index), _) => Some(VariantRequest::Index(index)),
            (None, Some(name)) => Some(VariantRequest::Name(name)),
            (None, None) => None,
        };
        Ok(CoreOptions {
            config: raw.config,
            variant,
            state: raw.state,
        })
    }
}

/// Keeps the latest persisted state until the host collects it
#[derive(Default)]
struct PendingSave(Rc<RefCell<Option<PersistedState>>>);

impl CoreObserver for PendingSave {
    fn on_persist(&mut self, state: &PersistedState, _queue: &mut ActionQueue) {
        *self.0.borrow_mut() = Some(state.clone());
    }
}

/// Session wrapper with string-in, string-out methods
struct Session {
    core: DoenetCore,
    pending: Rc<RefCell<Option<PersistedState>>>,
}

#[cfg(test)]
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

impl Session {
    fn new(source: &str, options: Option<&str>) -> Result<Self, String> {
        let options = OptionsJson::parse(options)?;
        let mut core = DoenetCore::new(source, options).map_err(|e| e.to_string())?;
        let pending = Rc::new(RefCell::new(None));
        core.add_observer(Box::new(PendingSave(pending.clone())))
            .map_err(|e| e.to_string())?;
        Ok(Self { core, pending })
    }

    fn dispatch(&mut self, component: &str, action: &str, args: &str) -> Result<(), String> {
        let args = if args.trim().is_empty() {
            serde_json::json!({})
        } else {
            serde_json::from_str(args).map_err(|e| format!("Invalid arguments: {e}"))?
        };
        self.core
            .dispatch(component, action, args)
            .map_err(|e| e.to_string())
    }

    fn snapshot(&mut self) -> Result<String, String> {
        serde_json::to_string(&snapshot(&mut self.core)).map_err(|e| e.to_string())
    }

    fn render_tree(&mut self) -> Result<String, String> {
        serde_json::to_string(&render_tree(&mut self.core)).map_err(|e| e.to_string())
    }

    fn persisted_state(&self) -> Result<String, String> {
        self.core.persisted_state().to_json().map_err(|e| e.to_string())
    }

    fn take_pending_save(&self) -> Result<Option<String>, String> {
        match self.pending.borrow_mut().take() {
            Some(state) => state.to_json().map(Some).map_err(|e| e.to_string()),
            None => Ok(None),
        }
    }

    fn variant(&self) -> Result<String, String> {
        serde_json::to_string(self.core.variant()).map_err(|e| e.to_string())
    }

    fn diagnostics(&self) -> Result<String, String> {
        serde_json::to_string(self.core.diagnostics()).map_err(|e| e.to_string())
    }
}

fn js_error(message: String) -> JsValue {
    JsValue::from_str(&message)
}

#[wasm_bindgen]
pub struct PublicDoenetCore {
    session: Session,
}

#[wasm_bindgen]
impl PublicDoenetCore {
    /// Build a document. `options` is JSON with optional `config`,
    /// `variantIndex`, `variantName` and `state`.
    #[wasm_bindgen(constructor)]
    pub fn new(source: &str, options: Option<String>) -> Result<PublicDoenetCore, JsValue> {
        let session = Session::new(source, options.as_deref()).map_err(js_error)?;
        Ok(PublicDoenetCore { session })
    }

    #[wasm_bindgen(js_name = requestAction)]
    pub fn request_action(&mut self, component: &str, action: &str, args: &str) -> Result<(), JsValue> {
        self.session.dispatch(component, action, args).map_err(js_error)
    }

    pub fn snapshot(&mut self) -> Result<String, JsValue> {
        self.session.snapshot().map_err(js_error)
    }

    #[wasm_bindgen(js_name = renderTree)]
    pub fn render_tree(&mut self) -> Result<String, JsValue> {
        self.session.render_tree().map_err(js_error)
    }

    #[wasm_bindgen(js_name = persistedState)]
    pub fn persisted_state(&self) -> Result<String, JsValue> {
        self.session.persisted_state().map_err(js_error)
    }

    /// State saved since the last call, if any
    #[wasm_bindgen(js_name = takePendingSave)]
    pub fn take_pending_save(&self) -> Result<Option<String>, JsValue> {
        self.session.take_pending_save().map_err(js_error)
    }

    pub fn variant(&self) -> Result<String, JsValue> {
        self.session.variant().map_err(js_error)
    }

    pub fn diagnostics(&self) -> Result<String, JsValue> {
        self.session.diagnostics().map_err(js_error)
    }

    /// Advance the debounce clock; the host drives it from its own timer.
    #[wasm_bindgen(js_name = advanceTime)]
    pub fn advance_time(&mut self, ms: u32) -> Result<(), JsValue> {
        self.session
            .core
            .advance_time(u64::from(ms))
            .map_err(|e| js_error(e.to_string()))
    }

    /// Commit pending edits now, e.g. before the page unloads.
    pub fn flush(&mut self) -> Result<(), JsValue> {
        self.session
            .core
            .flush_pending()
            .map_err(|e| js_error(e.to_string()))
    }

    pub fn undo(&mut self) -> Result<bool, JsValue> {
        self.session.core.undo().map_err(|e| js_error(e.to_string()))
    }

    pub fn redo(&mut self) -> Result<bool, JsValue> {
        self.session.core.redo().map_err(|e| js_error(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_round_trip() {
        let mut session = Session::new(
            r#"<booleanInput name="bi"/><boolean name="b">$bi</boolean>"#,
            None,
        )
        .unwrap();
        assert!(session.take_pending_save().unwrap().is_none());

        session.dispatch("/bi", "updateBoolean", r#"{"boolean": true}"#).unwrap();

        let snapshot: serde_json::Value = serde_json::from_str(&session.snapshot().unwrap()).unwrap();
        assert_eq!(snapshot["/b"]["stateValues"]["value"], serde_json::json!(true));

        let saved = session.take_pending_save().unwrap().unwrap();
        assert_eq!(saved, session.persisted_state().unwrap());
        assert!(session.take_pending_save().unwrap().is_none());
    }

    #[test]
    fn test_options_select_variant_and_config() {
        let source = r#"<selectFromSequence from="1" to="3"/>"#;
        let session = Session::new(source, Some(r#"{"variantName": "b", "config": {"debounceMs": 5}}"#))
            .unwrap();

        let variant: serde_json::Value = serde_json::from_str(&session.variant().unwrap()).unwrap();
        assert_eq!(variant["index"], serde_json::json!(2));
        assert_eq!(session.core.config().debounce_ms, 5);
    }

    #[test]
    fn test_bad_inputs_are_messages() {
        assert!(Session::new("<p>", None).unwrap_err().starts_with("Parse error"));
        assert!(Session::new("", Some("{not json")).unwrap_err().starts_with("Invalid options"));

        let mut session = Session::new(r#"<booleanInput name="bi"/>"#, None).unwrap();
        assert!(session.dispatch("/bi", "toggle", "[").is_err());
    }
}
