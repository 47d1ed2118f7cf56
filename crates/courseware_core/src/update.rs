use crate::{AppState, Effect, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::UploadSubmitted { form, file_path } => match form.parse() {
            Ok(metadata) => {
                let job_id = state.start_job(metadata.title.clone(), file_path.clone());
                vec![Effect::StartUpload {
                    job_id,
                    file_path,
                    metadata,
                }]
            }
            Err(err) => {
                state.reject(file_path, err.to_string());
                Vec::new()
            }
        },
        Msg::UploadProgress {
            job_id,
            phase,
            percent,
            message,
        } => {
            state.apply_progress(job_id, phase, percent, message);
            Vec::new()
        }
        Msg::UploadFinished { job_id, result } => {
            state.apply_finished(job_id, result);
            Vec::new()
        }
        Msg::CancelRequested { job_id } => {
            if state.request_cancel(job_id) {
                vec![Effect::CancelUpload { job_id }]
            } else {
                Vec::new()
            }
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
