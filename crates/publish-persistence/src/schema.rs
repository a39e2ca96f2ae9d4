//! Esquema Diesel (mantenido a mano). Reemplazable con `diesel print-schema`.

diesel::table! {
    publish_event_log (seq) {
        seq -> BigInt,
        run_id -> Uuid,
        ts -> Timestamptz,
        event_type -> Text,
        payload -> Jsonb,
    }
}

diesel::table! {
    publish_step_artifacts (artifact_hash) {
        artifact_hash -> Text,
        kind -> Text,
        payload -> Jsonb,
        metadata -> Nullable<Jsonb>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(publish_event_log, publish_step_artifacts,);
