use shared_kernel::uuid_key;

uuid_key!(AppointmentId);
