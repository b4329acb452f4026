//! Diesel schema definitions.

diesel::table! {
    credentials (id) {
        id -> Text,
        api_key -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    devices (uid) {
        uid -> Text,
        credential_id -> Text,
        platform -> Text,
        identity -> Text,
        token -> Text,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    dispatch_attempts (id) {
        id -> Text,
        credential_id -> Text,
        status -> Text,
        recipients -> Text,
        failures -> Text,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::joinable!(devices -> credentials (credential_id));
diesel::joinable!(dispatch_attempts -> credentials (credential_id));

diesel::allow_tables_to_appear_in_same_query!(credentials, devices, dispatch_attempts);
